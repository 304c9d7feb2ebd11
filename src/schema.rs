/// The type of a record field.
///
/// String fields carry the maximum number of characters they may hold; the
/// layout reserves the UTF-8 worst case for them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Int64,
    Uint64,
    String(usize),
}

impl FieldType {
    /// The numeric code stored in the field catalog.
    pub fn code(&self) -> i64 {
        match self {
            FieldType::Int64 => 0,
            FieldType::Uint64 => 1,
            FieldType::String(_) => 2,
        }
    }

    pub fn length(&self) -> usize {
        match self {
            FieldType::String(len) => *len,
            _ => 0,
        }
    }

    pub fn from_code(code: i64, length: usize) -> Option<Self> {
        match code {
            0 => Some(FieldType::Int64),
            1 => Some(FieldType::Uint64),
            2 => Some(FieldType::String(length)),
            _ => None,
        }
    }
}

/// The record schema of a table: an ordered list of named, typed fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<(String, FieldType)>,
}

impl Schema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn add_field(&mut self, name: &str, ty: FieldType) -> &mut Self {
        assert!(!self.has_field(name), "duplicate field '{}'", name);
        self.fields.push((name.to_string(), ty));
        self
    }

    pub fn add_i64_field(&mut self, name: &str) -> &mut Self {
        self.add_field(name, FieldType::Int64)
    }

    pub fn add_u64_field(&mut self, name: &str) -> &mut Self {
        self.add_field(name, FieldType::Uint64)
    }

    pub fn add_string_field(&mut self, name: &str, length: usize) -> &mut Self {
        self.add_field(name, FieldType::String(length))
    }

    /// Copy a field, with its type, from another schema.
    pub fn add_from(&mut self, name: &str, other: &Schema) {
        let ty = other
            .field_type(name)
            .unwrap_or_else(|| panic!("schema has no field named '{}'", name));
        self.add_field(name, ty);
    }

    pub fn add_all(&mut self, other: &Schema) {
        for (name, ty) in other.fields.iter() {
            self.add_field(name, *ty);
        }
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.fields.iter().map(|(n, ty)| (n.as_str(), *ty))
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }
}
