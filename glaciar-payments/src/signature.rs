use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Parsed `x-signature` header: `ts=<unix>,v1=<hex hmac>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParts {
    pub ts: String,
    pub v1: String,
}

pub fn parse_signature_header(header: &str) -> Option<SignatureParts> {
    let mut ts = None;
    let mut v1 = None;
    for part in header.split(',') {
        let (key, value) = part.trim().split_once('=')?;
        match key.trim() {
            "ts" => ts = Some(value.trim().to_string()),
            "v1" => v1 = Some(value.trim().to_string()),
            _ => {}
        }
    }
    Some(SignatureParts { ts: ts?, v1: v1? })
}

/// Recompute the HMAC over the gateway's canonical manifest and compare
/// against the signed header value.
pub fn verify_signature(
    secret: &str,
    data_id: &str,
    request_id: &str,
    parts: &SignatureParts,
) -> bool {
    let manifest = format!("id:{data_id};request-id:{request_id};ts:{ts};", ts = parts.ts);

    let Ok(expected) = hex::decode(&parts.v1) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("hmac accepts any key length");
    mac.update(manifest.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, manifest: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(manifest.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn parses_ts_and_v1() {
        let parts = parse_signature_header("ts=1700000000,v1=abcdef12").unwrap();
        assert_eq!(parts.ts, "1700000000");
        assert_eq!(parts.v1, "abcdef12");
    }

    #[test]
    fn parse_rejects_malformed_header() {
        assert!(parse_signature_header("garbage").is_none());
        assert!(parse_signature_header("ts=123").is_none());
    }

    #[test]
    fn valid_signature_verifies() {
        let secret = "whsec_test";
        let v1 = sign(secret, "id:12345;request-id:req-1;ts:1700000000;");
        let parts = SignatureParts { ts: "1700000000".into(), v1 };
        assert!(verify_signature(secret, "12345", "req-1", &parts));
    }

    #[test]
    fn tampered_payment_id_fails() {
        let secret = "whsec_test";
        let v1 = sign(secret, "id:12345;request-id:req-1;ts:1700000000;");
        let parts = SignatureParts { ts: "1700000000".into(), v1 };
        assert!(!verify_signature(secret, "99999", "req-1", &parts));
    }

    #[test]
    fn wrong_secret_fails() {
        let v1 = sign("other_secret", "id:12345;request-id:req-1;ts:1700000000;");
        let parts = SignatureParts { ts: "1700000000".into(), v1 };
        assert!(!verify_signature("whsec_test", "12345", "req-1", &parts));
    }
}
