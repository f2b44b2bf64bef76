use crate::constant::{BINARY_CHARSET, ColumnFlags, ColumnType};
use crate::error::{Error, Result};
use crate::protocol::command::{ColumnDefinition, ColumnDefinitionBytes};

/// Owned column descriptor of a result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub schema: String,
    pub table: String,
    pub org_table: String,
    pub name: String,
    pub org_name: String,
    /// Collation id of the column's character set
    pub charset: u16,
    pub column_length: u32,
    pub column_type: ColumnType,
    pub flags: ColumnFlags,
    pub decimals: u8,
}

impl Column {
    /// A synthetic column, used to describe values that did not come from the server
    pub fn new(name: impl Into<String>, column_type: ColumnType, flags: ColumnFlags) -> Self {
        Self {
            schema: String::new(),
            table: String::new(),
            org_table: String::new(),
            name: name.into(),
            org_name: String::new(),
            charset: 33,
            column_length: 0,
            column_type,
            flags,
            decimals: 0,
        }
    }

    pub fn with_charset(mut self, charset: u16) -> Self {
        self.charset = charset;
        self
    }

    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(ColumnFlags::UNSIGNED_FLAG)
    }

    pub fn is_not_null(&self) -> bool {
        self.flags.contains(ColumnFlags::NOT_NULL_FLAG)
    }

    /// Whether string-like cells of this column are raw bytes rather than text
    pub fn is_binary(&self) -> bool {
        self.charset == BINARY_CHARSET
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl TryFrom<ColumnDefinition<'_>> for Column {
    type Error = Error;

    fn try_from(def: ColumnDefinition<'_>) -> Result<Self> {
        Ok(Self {
            schema: lossy(def.schema),
            table: lossy(def.table_alias),
            org_table: lossy(def.table_original),
            name: lossy(def.name_alias),
            org_name: lossy(def.name_original),
            charset: def.tail.charset(),
            column_length: def.tail.column_length(),
            column_type: def.tail.column_type()?,
            flags: def.tail.flags(),
            decimals: def.tail.decimals(),
        })
    }
}

impl TryFrom<ColumnDefinitionBytes<'_>> for Column {
    type Error = Error;

    fn try_from(bytes: ColumnDefinitionBytes<'_>) -> Result<Self> {
        Column::try_from(ColumnDefinition::try_from(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::mock;

    #[test]
    fn test_column_from_packet() {
        let packet = mock::column_definition_packet(
            "t",
            "amount",
            ColumnType::MYSQL_TYPE_LONGLONG,
            ColumnFlags::UNSIGNED_FLAG | ColumnFlags::NOT_NULL_FLAG,
            63,
        );
        let col = Column::try_from(ColumnDefinitionBytes(&packet)).unwrap();
        assert_eq!(col.name, "amount");
        assert_eq!(col.table, "t");
        assert_eq!(col.column_type, ColumnType::MYSQL_TYPE_LONGLONG);
        assert!(col.is_unsigned());
        assert!(col.is_not_null());
        assert!(col.is_binary());
    }
}
