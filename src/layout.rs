use std::collections::HashMap;

use crate::page::{bytes_needed, MAX_VARINT_LEN64};
use crate::schema::{FieldType, Schema};

/// The UTF-8 worst case per character, reserved for string fields.
const UTF8_MAX: usize = 4;

/// Layout maps a schema onto the fixed-size slots of a record page: a framed
/// used/free flag at slot offset 0, then one framed value per field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    schema: Schema,
    offsets: HashMap<String, usize>,
    slot_size: usize,
}

impl Layout {
    // TODO: reject schemas whose slot size exceeds the block size; today a
    // record page over such a layout simply has zero usable slots.
    pub fn new(schema: Schema) -> Self {
        let mut offsets = HashMap::new();
        let mut pos = bytes_needed(MAX_VARINT_LEN64);
        for (name, ty) in schema.fields() {
            offsets.insert(name.to_string(), pos);
            pos += Self::byte_length(ty);
        }

        Self {
            schema,
            offsets,
            slot_size: pos,
        }
    }

    /// Rebuild a layout whose offsets were read back from the field catalog.
    pub fn from_parts(schema: Schema, offsets: HashMap<String, usize>, slot_size: usize) -> Self {
        Self {
            schema,
            offsets,
            slot_size,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn offset(&self, field_name: &str) -> Option<usize> {
        self.offsets.get(field_name).copied()
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    fn byte_length(ty: FieldType) -> usize {
        match ty {
            FieldType::Int64 | FieldType::Uint64 => bytes_needed(MAX_VARINT_LEN64),
            FieldType::String(len) => bytes_needed(len * UTF8_MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_and_slot_size() {
        let mut schema = Schema::new();
        schema
            .add_i64_field("sid")
            .add_string_field("sname", 10)
            .add_u64_field("grad_year");
        let layout = Layout::new(schema);

        // The flag slot occupies 20 bytes, integers 20, a 10-char string 50.
        assert_eq!(layout.offset("sid"), Some(20));
        assert_eq!(layout.offset("sname"), Some(40));
        assert_eq!(layout.offset("grad_year"), Some(90));
        assert_eq!(layout.slot_size(), 110);
        assert_eq!(layout.offset("nope"), None);
    }
}
