//! Register map types and data structures

use crate::error::{HkError, HkResult};

/// Register access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Read-only
    ReadOnly,
    /// Read-write
    ReadWrite,
}

/// A named bit-field within one 32-bit register word
///
/// Fields in the housekeeping block are right-aligned, so `mask` is both the
/// in-word position and the width of the logical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name as it appears in the register documentation
    pub name: &'static str,

    /// Byte offset of the owning word from the block base
    pub offset: usize,

    /// Bits of the word that belong to this field
    pub mask: u32,

    /// Declared upper bound of the logical value, if narrower than the mask
    pub max: Option<u32>,

    /// Access mode
    pub access: Access,
}

impl FieldDescriptor {
    /// Read-write field
    pub const fn rw(name: &'static str, offset: usize, mask: u32) -> Self {
        Self {
            name,
            offset,
            mask,
            max: None,
            access: Access::ReadWrite,
        }
    }

    /// Read-only field
    pub const fn ro(name: &'static str, offset: usize, mask: u32) -> Self {
        Self {
            name,
            offset,
            mask,
            max: None,
            access: Access::ReadOnly,
        }
    }

    /// Builder: declare an upper bound for the logical value
    pub const fn bounded(mut self, max: u32) -> Self {
        self.max = Some(max);
        self
    }

    /// Field occupies every bit of its word
    pub fn is_whole_word(&self) -> bool {
        self.mask == u32::MAX
    }

    /// One past the last byte of the owning word
    pub fn end(&self) -> usize {
        self.offset + 4
    }

    /// Extract the field value from a register word
    pub fn extract(&self, word: u32) -> u32 {
        word & self.mask
    }

    /// Replace the field bits of `word` with `value`, keeping every other bit
    pub fn insert(&self, word: u32, value: u32) -> u32 {
        (word & !self.mask) | (value & self.mask)
    }
}

/// Declarative register layout of a peripheral block
#[derive(Debug, Clone, Copy)]
pub struct RegisterMap {
    /// Block name for diagnostics
    pub name: &'static str,

    /// Physical base address
    pub base: usize,

    /// Declared block size in bytes
    pub size: usize,

    /// All fields of the block
    pub fields: &'static [FieldDescriptor],
}

impl RegisterMap {
    /// Look up a field by name
    pub fn find(&self, name: &str) -> HkResult<&'static FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| HkError::UnknownField(name.to_string()))
    }

    /// One past the last byte covered by any field
    pub fn span(&self) -> usize {
        self.fields.iter().map(FieldDescriptor::end).max().unwrap_or(0)
    }

    /// Number of 32-bit words needed to cover every field
    pub fn word_count(&self) -> usize {
        self.span() / 4
    }

    /// Fields whose word does not fit inside a block of `size` bytes
    pub fn fields_outside(&self, size: usize) -> Vec<&'static FieldDescriptor> {
        self.fields.iter().filter(|f| f.end() > size).collect()
    }

    /// Check alignment and that no two fields share bits of the same word
    pub fn validate(&self) -> HkResult<()> {
        for (i, field) in self.fields.iter().enumerate() {
            if field.offset % 4 != 0 {
                return Err(HkError::InvalidOffset(field.offset));
            }
            if field.mask == 0 {
                return Err(HkError::ConfigError(format!(
                    "field '{}' has an empty mask",
                    field.name
                )));
            }
            if let Some(max) = field.max {
                if max & !field.mask != 0 {
                    return Err(HkError::ConfigError(format!(
                        "bound {} of field '{}' does not fit mask 0x{:x}",
                        max, field.name, field.mask
                    )));
                }
            }
            for other in &self.fields[i + 1..] {
                if other.offset == field.offset && other.mask & field.mask != 0 {
                    return Err(HkError::ConfigError(format!(
                        "fields '{}' and '{}' overlap at offset 0x{:02x}",
                        field.name, other.name, field.offset
                    )));
                }
                if other.name == field.name {
                    return Err(HkError::ConfigError(format!(
                        "duplicate field name '{}'",
                        field.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Snapshot of every word of a register block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterImage {
    words: Vec<u32>,
}

impl RegisterImage {
    /// Create from words starting at offset 0
    pub fn from_words(words: Vec<u32>) -> Self {
        Self { words }
    }

    /// Word at a byte offset (zero beyond the captured range)
    pub fn word(&self, offset: usize) -> u32 {
        self.words.get(offset / 4).copied().unwrap_or(0)
    }

    /// Value of a field in this snapshot
    pub fn field(&self, field: &FieldDescriptor) -> u32 {
        field.extract(self.word(field.offset))
    }

    /// All captured words
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Byte offsets of the words that differ between two snapshots
    pub fn diff(&self, other: &RegisterImage) -> Vec<usize> {
        let len = self.words.len().max(other.words.len());
        (0..len)
            .map(|i| i * 4)
            .filter(|&offset| self.word(offset) != other.word(offset))
            .collect()
    }
}
