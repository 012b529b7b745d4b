use crate::crypto::tls::{CaCertificate, TlsSettings};
use crate::crypto::{
    AEAD_NONCE_LEN, AEAD_TAG_LEN, CLIENT_NONCE_LEN, FINGERPRINT_PREFIX, SharedKey,
    certificate_der_from_pem, compute_proof, decrypt, derive_shared_key, encrypt, fingerprint,
    fingerprint_pem, generate_certificate_request, generate_client_nonce, hex_decode, hex_encode,
};
use crate::error::crypto::CryptoError;

use rcgen::{CertificateParams, KeyPair};

const CODE: &str = "123456";
const CHALLENGE: &[u8] = b"0123456789abcdef0123456789abcdef";
const SENSOR_ID: &str = "sensor-1";

fn self_signed_pem() -> String {
    let key_pair = KeyPair::generate().expect("keypair");
    CertificateParams::new(vec![String::from("sensor.local")])
        .expect("params")
        .self_signed(&key_pair)
        .expect("self-signed certificate")
        .pem()
}

fn test_key() -> SharedKey {
    derive_shared_key(CODE, CHALLENGE, &[7u8; CLIENT_NONCE_LEN], SENSOR_ID).expect("derive key")
}

/// **VALUE**: Verifies the proof is a pure function of challenge and code.
///
/// **WHY THIS MATTERS**: The sensor recomputes the proof on its side. Any hidden input
/// (randomness, timestamps) would make every pairing fail verification.
///
/// **BUG THIS CATCHES**: Would catch the challenge and code being swapped as key and message,
/// which still produces deterministic output but a different value than the sensor expects.
#[test]
fn given_same_inputs_when_computing_proof_then_deterministic_and_code_sensitive() {
    // GIVEN/WHEN: Two proofs over the same inputs and one with another code
    let first = compute_proof(CHALLENGE, CODE).expect("proof");
    let second = compute_proof(CHALLENGE, CODE).expect("proof");
    let other_code = compute_proof(CHALLENGE, "654321").expect("proof");

    // THEN: Equal for equal inputs, different for a different code
    assert_eq!(first, second);
    assert_ne!(first, other_code);
}

/// **VALUE**: Verifies the proof matches HMAC-SHA256 keyed with the code.
///
/// **WHY THIS MATTERS**: Interoperability with the sensor depends on this exact construction.
#[test]
fn given_known_inputs_when_computing_proof_then_matches_hmac_sha256() {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // GIVEN: A reference MAC keyed with the code over the challenge
    let mut reference = Hmac::<Sha256>::new_from_slice(CODE.as_bytes()).expect("hmac key");
    reference.update(CHALLENGE);
    let expected: [u8; 32] = reference.finalize().into_bytes().into();

    // WHEN
    let proof = compute_proof(CHALLENGE, CODE).expect("proof");

    // THEN
    assert_eq!(proof, expected);
}

/// **VALUE**: Verifies each input to the key derivation actually changes the key.
///
/// **BUG THIS CATCHES**: Would catch the sensor id or client nonce being left out of
/// the derivation, which would let one pairing's key decrypt another's payloads.
#[test]
fn given_different_inputs_when_deriving_key_then_keys_differ() {
    // GIVEN: The baseline key
    let baseline = test_key();

    // WHEN: Varying one input at a time
    let other_nonce =
        derive_shared_key(CODE, CHALLENGE, &[8u8; CLIENT_NONCE_LEN], SENSOR_ID).expect("key");
    let other_sensor =
        derive_shared_key(CODE, CHALLENGE, &[7u8; CLIENT_NONCE_LEN], "sensor-2").expect("key");
    let other_code =
        derive_shared_key("000000", CHALLENGE, &[7u8; CLIENT_NONCE_LEN], SENSOR_ID).expect("key");

    // THEN: Same inputs give the same key, every variation gives another
    assert_eq!(baseline, test_key());
    assert_ne!(baseline, other_nonce);
    assert_ne!(baseline, other_sensor);
    assert_ne!(baseline, other_code);
}

/// **VALUE**: Verifies encrypt/decrypt agree and the output layout carries nonce and tag.
#[test]
fn given_plaintext_when_encrypt_then_decrypt_returns_plaintext() {
    // GIVEN
    let key = test_key();
    let plaintext = b"-----BEGIN CERTIFICATE-----";

    // WHEN
    let sealed = encrypt(plaintext, &key).expect("encrypt");

    // THEN: nonce(12) || ciphertext || tag(16)
    assert_eq!(sealed.len(), AEAD_NONCE_LEN + plaintext.len() + AEAD_TAG_LEN);
    assert_eq!(decrypt(&sealed, &key).expect("decrypt"), plaintext);
}

/// **VALUE**: Verifies encryption never reuses a nonce.
///
/// **WHY THIS MATTERS**: AES-GCM with a repeated nonce under one key leaks the XOR of the
/// plaintexts and allows tag forgery.
#[test]
fn given_same_plaintext_when_encrypting_twice_then_outputs_differ() {
    let key = test_key();

    let first = encrypt(b"csr", &key).expect("encrypt");
    let second = encrypt(b"csr", &key).expect("encrypt");

    assert_ne!(first[..AEAD_NONCE_LEN], second[..AEAD_NONCE_LEN]);
    assert_ne!(first, second);
}

/// **VALUE**: Verifies a ciphertext sealed under one key is rejected under another.
///
/// **WHY THIS MATTERS**: A wrong pairing code derives a different key. The CA certificate
/// step must fail loudly rather than hand back garbage.
#[test]
fn given_wrong_key_when_decrypting_then_decryption_error() {
    // GIVEN: A payload sealed with the real key
    let sealed = encrypt(b"payload", &test_key()).expect("encrypt");
    let wrong = SharedKey::from_bytes([0u8; 32]);

    // WHEN
    let result = decrypt(&sealed, &wrong);

    // THEN
    assert!(matches!(result, Err(CryptoError::Decryption { .. })));
}

/// **VALUE**: Verifies inputs shorter than nonce plus tag are refused before touching AES.
#[test]
fn given_truncated_input_when_decrypting_then_too_short_error() {
    let result = decrypt(&[0u8; AEAD_NONCE_LEN + AEAD_TAG_LEN - 1], &test_key());

    match result {
        Err(CryptoError::Decryption { message, .. }) => {
            assert!(message.contains("too short"), "got: {message}");
        }
        other => panic!("expected decryption error, got {other:?}"),
    }
}

/// **VALUE**: Verifies a single flipped ciphertext bit fails authentication.
#[test]
fn given_tampered_ciphertext_when_decrypting_then_rejected() {
    let key = test_key();
    let mut sealed = encrypt(b"payload", &key).expect("encrypt");
    sealed[AEAD_NONCE_LEN] ^= 0x01;

    assert!(decrypt(&sealed, &key).is_err());
}

#[test]
fn given_fresh_nonces_when_generated_then_distinct() {
    let first = generate_client_nonce();
    let second = generate_client_nonce();

    assert_eq!(first.len(), CLIENT_NONCE_LEN);
    assert_ne!(first, second);
}

/// **VALUE**: Verifies hex encoding is lowercase and decoding rejects malformed input.
///
/// **BUG THIS CATCHES**: Would catch odd-length or non-hex challenge strings from a
/// misbehaving sensor being silently truncated.
#[test]
fn given_hex_helpers_when_encoding_and_decoding_then_lowercase_and_strict() {
    // GIVEN/WHEN
    let encoded = hex_encode(&[0xAB, 0x01, 0xff]);

    // THEN
    assert_eq!(encoded, "ab01ff");
    assert_eq!(hex_decode("AB01FF").expect("uppercase decodes"), vec![0xAB, 0x01, 0xff]);
    assert_eq!(hex_decode("").expect("empty decodes"), Vec::<u8>::new());
    assert!(matches!(hex_decode("abc"), Err(CryptoError::HexDecode { .. })));
    assert!(matches!(hex_decode("zz"), Err(CryptoError::HexDecode { .. })));
}

#[test]
fn given_der_bytes_when_fingerprinting_then_prefixed_sha256_hex() {
    let value = fingerprint(b"abc");

    assert_eq!(
        value,
        "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert!(value.starts_with(FINGERPRINT_PREFIX));
}

/// **VALUE**: Verifies the PEM fingerprint is taken over the DER body, not the PEM text.
///
/// **WHY THIS MATTERS**: The sensor identifies the companion by this value. Hashing the PEM
/// text would change with line endings and never match the sensor's record.
#[test]
fn given_certificate_pem_when_fingerprinting_then_matches_der_fingerprint() {
    // GIVEN
    let pem = self_signed_pem();
    let der = certificate_der_from_pem(&pem).expect("parse pem");

    // WHEN
    let from_pem = fingerprint_pem(&pem).expect("fingerprint");

    // THEN
    assert_eq!(from_pem, fingerprint(der.as_ref()));
    assert_eq!(from_pem.len(), FINGERPRINT_PREFIX.len() + 64);
}

#[test]
fn given_garbage_when_fingerprinting_pem_then_certificate_error() {
    let result = fingerprint_pem("not a certificate");

    assert!(matches!(result, Err(CryptoError::Certificate { .. })));
}

/// **VALUE**: Verifies the generated CSR and key are PEM documents the sensor can parse.
#[test]
fn given_common_name_when_generating_csr_then_pem_request_and_key() {
    // GIVEN/WHEN
    let request = generate_certificate_request("sensor-companion-test").expect("csr");

    // THEN
    assert!(request.csr_pem.starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
    assert!(request.private_key_pem.as_str().contains("PRIVATE KEY"));
    assert!(!format!("{request:?}").contains("PRIVATE KEY"));
}

#[test]
fn given_shared_key_when_debug_formatted_then_redacted() {
    let rendered = format!("{:?}", SharedKey::from_bytes([0x42; 32]));

    assert_eq!(rendered, "SharedKey([REDACTED])");
}

/// **VALUE**: Verifies both pinning modes produce a usable rustls config.
#[test]
fn given_ca_pem_when_building_tls_config_then_pinned_and_unpinned_succeed() {
    // GIVEN
    let ca = CaCertificate::from_pem(&self_signed_pem()).expect("ca");
    let pinned = TlsSettings {
        pinning: crate::crypto::tls::PinningMode::PinnedTo(ca),
        identity: None,
    };

    // WHEN/THEN
    assert!(pinned.is_pinned());
    assert!(pinned.client_config().is_ok());
    assert!(!TlsSettings::unpinned().is_pinned());
    assert!(TlsSettings::unpinned().client_config().is_ok());
}

#[test]
fn given_invalid_pem_when_parsing_ca_then_error() {
    assert!(CaCertificate::from_pem("-----BEGIN NOTHING-----").is_err());
}
