use std::io::Write;
use tau_codec::{CalibratorClient, ClientError, CodecConfig, CodecError, MockTransport, Record};

const MODULES: &str = r#"{"$type":"System.Collections.Generic.List`1[[TAU.Devices.Channels.DIModuleInfo, TAU.Devices.Channels]], mscorlib","$values":[{"Slot":1,"ModuleType":"DI8"},{"Slot":2,"ModuleType":"DI8"}]}"#;

#[tokio::test]
async fn full_session_against_mock() {
    let transport = MockTransport::new()
        .with_response("SYST:MOD?", MODULES)
        .with_response("CONF:SCAN?", "10,REF1;1,UUT1;")
        .with_response(
            "READ?",
            "\"REF1,OHM,1,638782167121234560,25.123456,25.123401,C,1,0.0100;\"",
        );
    let client = CalibratorClient::new(transport);

    let modules = client.query_envelope("SYST:MOD?").await.unwrap().into_records().unwrap();
    assert_eq!(modules.len(), 2);
    assert!(modules.iter().all(|m| matches!(m, Record::DiModuleInfo(_))));

    let scans = client.query_scan_configs("CONF:SCAN?").await.unwrap();
    assert_eq!(scans[0].nplc.as_ref().map(|n| n.value()), Some(10));

    let reading = client.query_reading("READ?").await.unwrap();
    assert_eq!(reading.channel(), "REF1");

    assert_eq!(
        client.transport().sent().await,
        vec!["SYST:MOD?", "CONF:SCAN?", "READ?"]
    );
}

#[tokio::test]
async fn configured_depth_limit_applies() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[envelope]\nmax_depth = 1").unwrap();
    let config = CodecConfig::load_from(file.path()).unwrap();

    let nested = r#"{"$type":"TAU.Devices.Channels.DIModuleInfo","Slot":1,"Extra":{"$type":"TAU.Devices.Channels.DIModuleInfo","Slot":2}}"#;
    let transport = MockTransport::new().with_response("DEEP?", nested);
    let client = CalibratorClient::with_config(transport, &config);

    let err = client.query_envelope("DEEP?").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Codec(CodecError::EnvelopeTooDeep { limit: 1 })
    ));
}
