use crate::constant::{
    CAPABILITIES_ALWAYS_DISABLED, CAPABILITIES_ALWAYS_ENABLED, CAPABILITIES_CONFIGURABLE,
    CapabilityFlags, ColumnType, charset_collation_id,
};

#[test]
fn test_capability_flags_classification() {
    const ALL_FLAGS: u32 = 0xFFFFFFFF;

    let always_enabled = CAPABILITIES_ALWAYS_ENABLED;
    let configurable = CAPABILITIES_CONFIGURABLE;
    let always_disabled = CAPABILITIES_ALWAYS_DISABLED;

    assert!(
        always_enabled.intersection(configurable).is_empty(),
        "ALWAYS_ENABLED and CONFIGURABLE must not overlap"
    );
    assert!(
        always_enabled.intersection(always_disabled).is_empty(),
        "ALWAYS_ENABLED and ALWAYS_DISABLED must not overlap"
    );
    assert!(
        configurable.intersection(always_disabled).is_empty(),
        "CONFIGURABLE and ALWAYS_DISABLED must not overlap"
    );

    let union = always_enabled | configurable | always_disabled;
    assert_eq!(
        union.bits(),
        ALL_FLAGS,
        "missing flags: 0x{:08X}",
        ALL_FLAGS & !union.bits()
    );

    assert!(always_enabled.contains(CapabilityFlags::CLIENT_PROTOCOL_41));
    assert!(always_enabled.contains(CapabilityFlags::CLIENT_MULTI_RESULTS));
    assert!(always_disabled.contains(CapabilityFlags::CLIENT_LOCAL_FILES));
}

#[test]
fn test_column_type_from_u8() {
    assert_eq!(ColumnType::from_u8(0x0b), Some(ColumnType::MYSQL_TYPE_TIME));
    assert_eq!(ColumnType::from_u8(0xfe), Some(ColumnType::MYSQL_TYPE_STRING));
    assert_eq!(ColumnType::from_u8(0x50), None);
}

#[test]
fn test_charset_collation_id() {
    assert_eq!(charset_collation_id("utf8"), Some(33));
    assert_eq!(charset_collation_id("UTF8MB4"), Some(45));
    assert_eq!(charset_collation_id("binary"), Some(63));
    assert_eq!(charset_collation_id("klingon"), None);
}
