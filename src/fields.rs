use std::collections::HashMap;

use crate::types::Field;

/// `minm`: track title
pub const TRACK_NAME_CODE: &str = "6d696e6d";
/// `ascp`: sent as the comment, used as the artist
pub const COMMENT_CODE: &str = "61736370";
/// `asal`: album name
pub const ALBUM_CODE: &str = "6173616c";
/// `PICT`: cover art bytes
pub const PICTURE_CODE: &str = "50494354";

/// Maps 8-hex-character item codes to the fields they carry
#[derive(Debug, Clone)]
pub struct FieldTable {
    routes: HashMap<String, Field>,
}

impl FieldTable {
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Add or replace a route, returning the field it previously mapped to
    pub fn insert(&mut self, code: &str, field: Field) -> Option<Field> {
        self.routes.insert(normalize(code), field)
    }

    pub fn route(&self, code: &str) -> Option<Field> {
        match self.routes.get(code) {
            Some(field) => Some(*field),
            None => self.routes.get(&normalize(code)).copied(),
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for FieldTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert(TRACK_NAME_CODE, Field::TrackName);
        table.insert(COMMENT_CODE, Field::Artist);
        table.insert(ALBUM_CODE, Field::Album);
        table.insert(PICTURE_CODE, Field::Picture);
        table
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_routes_exactly_four_codes() {
        let table = FieldTable::default();
        assert_eq!(table.len(), 4);
        assert_eq!(table.route(TRACK_NAME_CODE), Some(Field::TrackName));
        assert_eq!(table.route(COMMENT_CODE), Some(Field::Artist));
        assert_eq!(table.route(ALBUM_CODE), Some(Field::Album));
        assert_eq!(table.route(PICTURE_CODE), Some(Field::Picture));
    }

    #[test]
    fn unknown_codes_are_not_routed() {
        let table = FieldTable::default();
        // `asar`, the dedicated artist code, is deliberately not routed
        assert_eq!(table.route("61736172"), None);
        assert_eq!(table.route(""), None);
    }

    #[test]
    fn lookup_ignores_case_and_padding() {
        let table = FieldTable::default();
        assert_eq!(table.route(" 6D696E6D "), Some(Field::TrackName));
    }

    #[test]
    fn insert_extends_and_overrides() {
        let mut table = FieldTable::default();
        assert_eq!(table.insert("61736172", Field::Artist), None);
        assert_eq!(table.insert(COMMENT_CODE, Field::Album), Some(Field::Artist));
        assert_eq!(table.route("61736172"), Some(Field::Artist));
        assert_eq!(table.route(COMMENT_CODE), Some(Field::Album));
    }
}
