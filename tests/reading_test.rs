use tau_codec::config::ReadingSettings;
use tau_codec::reading::{decode_reading, ReadingShape, NO_READING};
use tau_codec::{CodecError, Component, ReadingDecoder, TimeTag};

fn sample(ticks: i64, raw: &str, temperature: &str) -> String {
    format!("REF1,OHM,1,{ticks},{raw},{raw},C,1,{temperature}")
}

#[test]
fn samples_become_columns() {
    let text = format!(
        "\"{};{};{};\"",
        sample(638782167121234560, "25.500000", "0.0100"),
        sample(638782167131234560, "25.500100", NO_READING),
        sample(638782167141234560, "25.500200", "0.0102"),
    );
    let reading = decode_reading(&text).unwrap();
    assert_eq!(reading.shape(), ReadingShape::Temperature);
    assert_eq!(reading.len(), 3);

    let ticks: Vec<i64> = reading.primary().timestamps.iter().map(TimeTag::to_ticks).collect();
    assert_eq!(ticks, vec![638782167121234560, 638782167131234560, 638782167141234560]);

    let temperature = reading.temperature().unwrap();
    assert!(temperature.values[1].is_infinite() && temperature.values[1] < 0.0);
    assert_eq!(reading.encode().unwrap(), text);
}

#[test]
fn sentinel_only_applies_to_secondary_columns() {
    let text = sample(638782167121234560, NO_READING, "0.0100");
    match decode_reading(&text) {
        Err(CodecError::InvalidField { component, token, .. }) => {
            assert_eq!(component, Component::Reading);
            assert_eq!(token, NO_READING);
        }
        other => panic!("expected InvalidField, got {other:?}"),
    }
}

#[test]
fn differing_temperature_unit_is_inconsistent() {
    let text = format!(
        "{};{}",
        sample(638782167121234560, "25.500000", "0.0100"),
        sample(638782167131234560, "25.500100", "0.0100").replace(",C,", ",K,"),
    );
    match decode_reading(&text) {
        Err(CodecError::InconsistentSampleMetadata { field, expected, actual, .. }) => {
            assert_eq!(field, "temperature unit");
            assert_eq!(expected, "C");
            assert_eq!(actual, "K");
        }
        other => panic!("expected InconsistentSampleMetadata, got {other:?}"),
    }
}

#[test]
fn differing_channel_is_inconsistent() {
    let text = format!(
        "{};{}",
        sample(638782167121234560, "25.500000", "0.0100"),
        sample(638782167131234560, "25.500100", "0.0100").replacen("REF1", "UUT1", 1),
    );
    assert!(matches!(
        decode_reading(&text),
        Err(CodecError::InconsistentSampleMetadata { field: "channel name", .. })
    ));
}

#[test]
fn mixed_sample_shapes_are_rejected() {
    let text = format!(
        "{};REF1,OHM,1,638782167131234560,25.500100,25.500100",
        sample(638782167121234560, "25.500000", "0.0100"),
    );
    assert!(matches!(
        decode_reading(&text),
        Err(CodecError::FieldCountMismatch { expected: 9, actual: 6, .. })
    ));
}

#[test]
fn bad_timestamp_is_reported() {
    let text = "REF1,OHM,1,yesterday,25.5,25.5,C,1,0.01";
    match decode_reading(text) {
        Err(CodecError::MalformedTimestamp { token }) => assert_eq!(token, "yesterday"),
        other => panic!("expected MalformedTimestamp, got {other:?}"),
    }
}

#[test]
fn timestamp_outside_tick_range_fails_decode() {
    for token in ["+99999-01-01 00:00:00 000000", "0000-06-01 00:00:00 000000", "3155378976000000000"] {
        let text = format!("REF1,OHM,1,{token},25.5,25.5,C,1,0.01");
        assert!(
            matches!(decode_reading(&text), Err(CodecError::MalformedTimestamp { .. })),
            "{token}"
        );
    }
}

#[test]
fn settings_drive_temperature_precision() {
    let decoder = ReadingDecoder::with_settings(&ReadingSettings {
        temperature_precision: 3,
    });
    let reading = decoder
        .decode(&sample(638782167121234560, "25.500000", "0.010"))
        .unwrap();
    assert_eq!(reading.temperature().unwrap().precision, 3);
    assert!(reading.encode().unwrap().ends_with(",C,1,0.010;\""));
}
