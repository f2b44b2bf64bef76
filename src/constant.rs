/// MySQL command bytes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandByte {
    Quit = 0x01,
    InitDb = 0x02,
    Query = 0x03,
    FieldList = 0x04,
    Statistics = 0x09,
    Ping = 0x0e,
    ChangeUser = 0x11,
    StmtPrepare = 0x16,
    StmtExecute = 0x17,
    StmtSendLongData = 0x18,
    StmtClose = 0x19,
    StmtReset = 0x1a,
    SetOption = 0x1b,
    StmtFetch = 0x1c,
    ResetConnection = 0x1f,
}

bitflags::bitflags! {
    /// Client/server capability flags exchanged during the handshake
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CapabilityFlags: u32 {
        const CLIENT_LONG_PASSWORD = 0x00000001;
        const CLIENT_FOUND_ROWS = 0x00000002;
        const CLIENT_LONG_FLAG = 0x00000004;
        const CLIENT_CONNECT_WITH_DB = 0x00000008;
        const CLIENT_NO_SCHEMA = 0x00000010;
        const CLIENT_COMPRESS = 0x00000020;
        const CLIENT_ODBC = 0x00000040;
        const CLIENT_LOCAL_FILES = 0x00000080;
        const CLIENT_IGNORE_SPACE = 0x00000100;
        const CLIENT_PROTOCOL_41 = 0x00000200;
        const CLIENT_INTERACTIVE = 0x00000400;
        const CLIENT_SSL = 0x00000800;
        const CLIENT_IGNORE_SIGPIPE = 0x00001000;
        const CLIENT_TRANSACTIONS = 0x00002000;
        const CLIENT_RESERVED = 0x00004000;
        /// Formerly CLIENT_RESERVED2; announces 4.1 authentication
        const CLIENT_SECURE_CONNECTION = 0x00008000;
        const CLIENT_MULTI_STATEMENTS = 0x00010000;
        const CLIENT_MULTI_RESULTS = 0x00020000;
        const CLIENT_PS_MULTI_RESULTS = 0x00040000;
        const CLIENT_PLUGIN_AUTH = 0x00080000;
        const CLIENT_CONNECT_ATTRS = 0x00100000;
        const CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA = 0x00200000;
        const CLIENT_CAN_HANDLE_EXPIRED_PASSWORDS = 0x00400000;
        const CLIENT_SESSION_TRACK = 0x00800000;
        const CLIENT_DEPRECATE_EOF = 0x01000000;
        const CLIENT_OPTIONAL_RESULTSET_METADATA = 0x02000000;
        const CLIENT_ZSTD_COMPRESSION_ALGORITHM = 0x04000000;
        const CLIENT_QUERY_ATTRIBUTES = 0x08000000;
        const CLIENT_MULTI_FACTOR_AUTHENTICATION = 0x10000000;
        const CLIENT_CAPABILITY_EXTENSION = 0x20000000;
        const CLIENT_SSL_VERIFY_SERVER_CERT = 0x40000000;
        const CLIENT_REMEMBER_OPTIONS = 0x80000000;
    }
}

/// Capabilities the client always announces.
///
/// `CLIENT_MULTI_RESULTS` is required for `CALL` of procedures that return result sets.
pub const CAPABILITIES_ALWAYS_ENABLED: CapabilityFlags = CapabilityFlags::CLIENT_LONG_PASSWORD
    .union(CapabilityFlags::CLIENT_LONG_FLAG)
    .union(CapabilityFlags::CLIENT_PROTOCOL_41)
    .union(CapabilityFlags::CLIENT_TRANSACTIONS)
    .union(CapabilityFlags::CLIENT_SECURE_CONNECTION)
    .union(CapabilityFlags::CLIENT_MULTI_RESULTS)
    .union(CapabilityFlags::CLIENT_PS_MULTI_RESULTS)
    .union(CapabilityFlags::CLIENT_PLUGIN_AUTH)
    .union(CapabilityFlags::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA);

/// Capabilities a user may opt into through `Opts::capabilities`
pub const CAPABILITIES_CONFIGURABLE: CapabilityFlags = CapabilityFlags::CLIENT_FOUND_ROWS
    .union(CapabilityFlags::CLIENT_IGNORE_SPACE)
    .union(CapabilityFlags::CLIENT_MULTI_STATEMENTS)
    .union(CapabilityFlags::CLIENT_DEPRECATE_EOF);

/// Everything else. `CLIENT_CONNECT_WITH_DB` and `CLIENT_SSL` are derived from `Opts::db` and
/// `Opts::tls` rather than configured directly.
pub const CAPABILITIES_ALWAYS_DISABLED: CapabilityFlags = CapabilityFlags::all()
    .difference(CAPABILITIES_ALWAYS_ENABLED.union(CAPABILITIES_CONFIGURABLE));

bitflags::bitflags! {
    /// Server status flags carried by OK and EOF packets
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ServerStatusFlags: u16 {
        const SERVER_STATUS_IN_TRANS = 0x0001;
        const SERVER_STATUS_AUTOCOMMIT = 0x0002;
        const SERVER_MORE_RESULTS_EXISTS = 0x0008;
        const SERVER_STATUS_NO_GOOD_INDEX_USED = 0x0010;
        const SERVER_STATUS_NO_INDEX_USED = 0x0020;
        const SERVER_STATUS_CURSOR_EXISTS = 0x0040;
        const SERVER_STATUS_LAST_ROW_SENT = 0x0080;
        const SERVER_STATUS_DB_DROPPED = 0x0100;
        const SERVER_STATUS_NO_BACKSLASH_ESCAPES = 0x0200;
        const SERVER_STATUS_METADATA_CHANGED = 0x0400;
        const SERVER_QUERY_WAS_SLOW = 0x0800;
        const SERVER_PS_OUT_PARAMS = 0x1000;
        const SERVER_STATUS_IN_TRANS_READONLY = 0x2000;
        const SERVER_SESSION_STATE_CHANGED = 0x4000;
    }
}

bitflags::bitflags! {
    /// Column definition flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColumnFlags: u16 {
        const NOT_NULL_FLAG = 0x0001;
        const PRI_KEY_FLAG = 0x0002;
        const UNIQUE_KEY_FLAG = 0x0004;
        const MULTIPLE_KEY_FLAG = 0x0008;
        const BLOB_FLAG = 0x0010;
        const UNSIGNED_FLAG = 0x0020;
        const ZEROFILL_FLAG = 0x0040;
        const BINARY_FLAG = 0x0080;
        const ENUM_FLAG = 0x0100;
        const AUTO_INCREMENT_FLAG = 0x0200;
        const TIMESTAMP_FLAG = 0x0400;
        const SET_FLAG = 0x0800;
        const NO_DEFAULT_VALUE_FLAG = 0x1000;
        const ON_UPDATE_NOW_FLAG = 0x2000;
        const PART_KEY_FLAG = 0x4000;
        const NUM_FLAG = 0x8000;
    }
}

/// MySQL column types
#[expect(non_camel_case_types)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    MYSQL_TYPE_DECIMAL = 0x00,
    MYSQL_TYPE_TINY = 0x01,
    MYSQL_TYPE_SHORT = 0x02,
    MYSQL_TYPE_LONG = 0x03,
    MYSQL_TYPE_FLOAT = 0x04,
    MYSQL_TYPE_DOUBLE = 0x05,
    MYSQL_TYPE_NULL = 0x06,
    MYSQL_TYPE_TIMESTAMP = 0x07,
    MYSQL_TYPE_LONGLONG = 0x08,
    MYSQL_TYPE_INT24 = 0x09,
    MYSQL_TYPE_DATE = 0x0a,
    MYSQL_TYPE_TIME = 0x0b,
    MYSQL_TYPE_DATETIME = 0x0c,
    MYSQL_TYPE_YEAR = 0x0d,
    MYSQL_TYPE_NEWDATE = 0x0e,
    MYSQL_TYPE_VARCHAR = 0x0f,
    MYSQL_TYPE_BIT = 0x10,
    MYSQL_TYPE_TIMESTAMP2 = 0x11,
    MYSQL_TYPE_DATETIME2 = 0x12,
    MYSQL_TYPE_TIME2 = 0x13,
    MYSQL_TYPE_TYPED_ARRAY = 0x14,
    MYSQL_TYPE_JSON = 0xf5,
    MYSQL_TYPE_NEWDECIMAL = 0xf6,
    MYSQL_TYPE_ENUM = 0xf7,
    MYSQL_TYPE_SET = 0xf8,
    MYSQL_TYPE_TINY_BLOB = 0xf9,
    MYSQL_TYPE_MEDIUM_BLOB = 0xfa,
    MYSQL_TYPE_LONG_BLOB = 0xfb,
    MYSQL_TYPE_BLOB = 0xfc,
    MYSQL_TYPE_VAR_STRING = 0xfd,
    MYSQL_TYPE_STRING = 0xfe,
    MYSQL_TYPE_GEOMETRY = 0xff,
}

impl ColumnType {
    pub fn from_u8(value: u8) -> Option<Self> {
        let column_type = match value {
            0x00 => Self::MYSQL_TYPE_DECIMAL,
            0x01 => Self::MYSQL_TYPE_TINY,
            0x02 => Self::MYSQL_TYPE_SHORT,
            0x03 => Self::MYSQL_TYPE_LONG,
            0x04 => Self::MYSQL_TYPE_FLOAT,
            0x05 => Self::MYSQL_TYPE_DOUBLE,
            0x06 => Self::MYSQL_TYPE_NULL,
            0x07 => Self::MYSQL_TYPE_TIMESTAMP,
            0x08 => Self::MYSQL_TYPE_LONGLONG,
            0x09 => Self::MYSQL_TYPE_INT24,
            0x0a => Self::MYSQL_TYPE_DATE,
            0x0b => Self::MYSQL_TYPE_TIME,
            0x0c => Self::MYSQL_TYPE_DATETIME,
            0x0d => Self::MYSQL_TYPE_YEAR,
            0x0e => Self::MYSQL_TYPE_NEWDATE,
            0x0f => Self::MYSQL_TYPE_VARCHAR,
            0x10 => Self::MYSQL_TYPE_BIT,
            0x11 => Self::MYSQL_TYPE_TIMESTAMP2,
            0x12 => Self::MYSQL_TYPE_DATETIME2,
            0x13 => Self::MYSQL_TYPE_TIME2,
            0x14 => Self::MYSQL_TYPE_TYPED_ARRAY,
            0xf5 => Self::MYSQL_TYPE_JSON,
            0xf6 => Self::MYSQL_TYPE_NEWDECIMAL,
            0xf7 => Self::MYSQL_TYPE_ENUM,
            0xf8 => Self::MYSQL_TYPE_SET,
            0xf9 => Self::MYSQL_TYPE_TINY_BLOB,
            0xfa => Self::MYSQL_TYPE_MEDIUM_BLOB,
            0xfb => Self::MYSQL_TYPE_LONG_BLOB,
            0xfc => Self::MYSQL_TYPE_BLOB,
            0xfd => Self::MYSQL_TYPE_VAR_STRING,
            0xfe => Self::MYSQL_TYPE_STRING,
            0xff => Self::MYSQL_TYPE_GEOMETRY,
            _ => return None,
        };
        Some(column_type)
    }
}

/// Collation id of the `binary` character set
pub const BINARY_CHARSET: u16 = 63;

/// How string cells of a collation are turned into a [`Value`](crate::value::Value)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// `binary`: cells stay bytes
    Binary,
    /// `utf8mb3`/`utf8mb4`, and `ascii` as its subset
    Utf8,
    /// `latin1`: one byte per code point
    Latin1,
    /// Any other character set. Valid UTF-8 becomes text, anything else stays bytes.
    Other,
}

/// Classify a collation id by the character set it belongs to
pub fn collation_encoding(collation_id: u16) -> TextEncoding {
    match collation_id {
        BINARY_CHARSET => TextEncoding::Binary,
        5 | 8 | 15 | 31 | 47 | 48 | 49 | 94 => TextEncoding::Latin1,
        11 | 65 | 33 | 45 | 46 | 76 | 83 | 192..=215 | 223..=247 | 255..=323 => {
            TextEncoding::Utf8
        }
        _ => TextEncoding::Other,
    }
}

/// Map a character set name to the default collation id sent in the handshake response
pub fn charset_collation_id(name: &str) -> Option<u8> {
    let id = match name.to_ascii_lowercase().as_str() {
        "big5" => 1,
        "latin1" => 8,
        "latin2" => 9,
        "ascii" => 11,
        "ujis" => 12,
        "sjis" => 13,
        "hebrew" => 16,
        "euckr" => 19,
        "koi8r" => 7,
        "greek" => 25,
        "cp1250" => 26,
        "gbk" => 28,
        "latin5" => 30,
        "utf8" | "utf8mb3" => 33,
        "ucs2" => 35,
        "cp866" => 36,
        "latin7" => 41,
        "utf8mb4" => 45,
        "cp1251" => 51,
        "utf16" => 54,
        "cp1256" => 57,
        "cp1257" => 59,
        "utf32" => 60,
        "binary" => 63,
        "gb2312" => 24,
        "cp932" => 95,
        "eucjpms" => 97,
        _ => return None,
    };
    Some(id)
}

/// Server error codes (`ER_*`).
///
/// Codes are exposed to callers exactly as the server sent them; these constants exist so that
/// callers can match on them by name.
pub mod er {
    pub const CON_COUNT_ERROR: u16 = 1040;
    pub const HANDSHAKE_ERROR: u16 = 1043;
    pub const DBACCESS_DENIED_ERROR: u16 = 1044;
    pub const ACCESS_DENIED_ERROR: u16 = 1045;
    pub const NO_DB_ERROR: u16 = 1046;
    pub const UNKNOWN_COM_ERROR: u16 = 1047;
    pub const BAD_NULL_ERROR: u16 = 1048;
    pub const BAD_DB_ERROR: u16 = 1049;
    pub const TABLE_EXISTS_ERROR: u16 = 1050;
    pub const BAD_TABLE_ERROR: u16 = 1051;
    pub const NON_UNIQ_ERROR: u16 = 1052;
    pub const SERVER_SHUTDOWN: u16 = 1053;
    pub const BAD_FIELD_ERROR: u16 = 1054;
    pub const DUP_ENTRY: u16 = 1062;
    pub const PARSE_ERROR: u16 = 1064;
    pub const EMPTY_QUERY: u16 = 1065;
    pub const NO_SUCH_TABLE: u16 = 1146;
    pub const NET_PACKET_TOO_LARGE: u16 = 1153;
    pub const LOCK_WAIT_TIMEOUT: u16 = 1205;
    pub const LOCK_DEADLOCK: u16 = 1213;
    pub const NOT_SUPPORTED_AUTH_MODE: u16 = 1251;
    pub const WARN_DATA_OUT_OF_RANGE: u16 = 1264;
    pub const TRUNCATED_WRONG_VALUE: u16 = 1292;
    pub const SP_DOES_NOT_EXIST: u16 = 1305;
    pub const SP_WRONG_NO_OF_ARGS: u16 = 1318;
    pub const QUERY_INTERRUPTED: u16 = 1317;
    pub const NO_DEFAULT_FOR_FIELD: u16 = 1364;
    pub const DATA_TOO_LONG: u16 = 1406;
    pub const ROW_IS_REFERENCED_2: u16 = 1451;
    pub const NO_REFERENCED_ROW_2: u16 = 1452;
}
