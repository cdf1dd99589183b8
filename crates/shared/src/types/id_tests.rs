use super::*;
use std::str::FromStr;

/// Parses with padding, checks the serde form, and reads the JSON back.
fn assert_id_round_trip<T>(wrap: fn(Uuid) -> T)
where
    T: FromStr<Err = uuid::Error> + Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug,
{
    let uuid = Uuid::new_v4();
    let id = wrap(uuid);

    assert_eq!(T::from_str(&format!("  {uuid}\n")).unwrap(), id);

    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{uuid}\""));
    assert_eq!(serde_json::from_str::<T>(&json).unwrap(), id);
}

#[test]
fn test_typed_id_from_uuid() {
    let uuid = Uuid::new_v4();
    let id = EntryId::from_uuid(uuid);
    assert_eq!(id.into_inner(), uuid);
    assert_eq!(EntryId::from(uuid), id);
}

#[test]
fn test_typed_id_display() {
    let uuid = Uuid::new_v4();
    let id = TenantId::from_uuid(uuid);
    assert_eq!(format!("{id}"), uuid.to_string());
}

#[test]
fn test_typed_ids_trim_and_serialize_transparently() {
    assert_id_round_trip(TenantId::from_uuid);
    assert_id_round_trip(EntryId::from_uuid);
    assert_id_round_trip(OrderId::from_uuid);
    assert_id_round_trip(EventId::from_uuid);
}

#[test]
fn test_typed_id_from_str_error() {
    assert!(EventId::from_str("invalid").is_err());
    assert!(TenantId::from_str("").is_err());
    assert!(OrderId::from_str("   ").is_err());
}

#[test]
fn test_typed_id_rejects_non_string_json() {
    assert!(serde_json::from_str::<EntryId>("42").is_err());
}

#[test]
fn test_typed_ids_are_time_ordered() {
    let first = EventId::new();
    let second = EventId::new();
    assert!(first <= second);
}
