use plug_telemetry::new_request_ids;
use uuid::Uuid;

#[test]
fn request_ids_are_distinct_v4_uuids() {
    let first = new_request_ids();
    let second = new_request_ids();

    for id in [&first.request_id, &first.trace_id] {
        let parsed = Uuid::parse_str(id).expect("uuid");
        assert_eq!(parsed.get_version_num(), 4);
    }
    assert_ne!(first.request_id, first.trace_id);
    assert_ne!(first.request_id, second.request_id);
}
