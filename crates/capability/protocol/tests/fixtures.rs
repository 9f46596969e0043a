//! 独立计算的报文样本（AES-128 ECB，key = "0123456789abcdef"）

use plug_protocol::{
    Cipher, CryptoError, ErrorKind, PREFIX, ProtocolError, decode_response, decode_status,
    encode_status_request, unpad,
};

const KEY: &[u8] = b"0123456789abcdef";

/// dev1 的状态查询请求帧
const DEV1_REQUEST: &str = "000055aa000000000000000a00000028\
e85dd832581fe4732bedd0efe0450ac9d5771a557f6d615345a65f08d539b172\
6d624fcf0000aa55";

/// {"dps":{"1":true,"18":500,"19":123,"20":2300}}
const STATUS_RESPONSE: &str = "000055aa000000000000000a0000003c00000000\
c27ee03f8be481e63320de7dc6eb4296d0908e87f8f3d230e597fbfe45e49743\
66af51cc6b4c98af4bf2143439dd5837\
4b220f400000aa55";

/// 同一报文，但末尾填充字节为 0
const ZERO_PAD_RESPONSE: &str = "000055aa000000000000000a0000003c00000000\
c27ee03f8be481e63320de7dc6eb4296d0908e87f8f3d230e597fbfe45e49743\
2195579ea138588020d86c03e0ed354b\
976d4c2c0000aa55";

fn decode_fixture(fixture: &str) -> Result<domain::Telemetry, ProtocolError> {
    let frame = hex::decode(fixture).expect("fixture hex");
    let cipher = Cipher::new(KEY)?;
    let encrypted = decode_response(&frame)?;
    let decrypted = cipher.decrypt_blocks(encrypted)?;
    decode_status(unpad(&decrypted)?)
}

#[test]
fn request_frame_matches_fixture() {
    let cipher = Cipher::new(KEY).expect("cipher");
    let frame = encode_status_request(&cipher, "dev1").expect("frame");

    assert_eq!(frame[..11], PREFIX);
    assert_eq!(frame[15] as usize, frame.len() - 16);
    assert_eq!(hex::encode(&frame), DEV1_REQUEST);
}

#[test]
fn status_fixture_decodes() {
    let telemetry = decode_fixture(STATUS_RESPONSE).expect("telemetry");

    assert!(telemetry.switch_on);
    assert_eq!(telemetry.current_amps, 0.5);
    assert_eq!(telemetry.power_watts, 12.3);
    assert_eq!(telemetry.voltage_volts, 230.0);
}

#[test]
fn zero_pad_fixture_is_crypto_error() {
    let err = decode_fixture(ZERO_PAD_RESPONSE).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Crypto);
    assert!(matches!(err, ProtocolError::Crypto(CryptoError::Padding(_))));
}
