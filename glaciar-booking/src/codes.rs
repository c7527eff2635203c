use chrono::{DateTime, Utc};
use uuid::Uuid;

use glaciar_core::error::Rejection;
use glaciar_core::package::SessionCode;

/// Check a session code against a requested service. Pure; the caller owns
/// the CAS that actually consumes the code.
///
/// Used wins over expired: a reused code reports `CodeUsed` regardless of
/// service or expiry.
pub fn validate_session_code(
    code: &SessionCode,
    service_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), Rejection> {
    if code.is_used {
        return Err(Rejection::CodeUsed);
    }
    if now > code.expires_at {
        return Err(Rejection::CodeExpired);
    }
    if !code.applicable_service_ids.contains(&service_id) {
        return Err(Rejection::CodeNotApplicable);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn code(service_id: Uuid, now: DateTime<Utc>) -> SessionCode {
        SessionCode {
            id: Uuid::new_v4(),
            code: "GLC-A1B2C3D4".to_string(),
            order_id: Uuid::new_v4(),
            payment_id: Some("12345".to_string()),
            applicable_service_ids: vec![service_id],
            buyer_email: "ana@example.cl".to_string(),
            purchased_at: now - Duration::days(10),
            expires_at: now + Duration::days(80),
            is_used: false,
            used_in_booking_id: None,
            used_at: None,
            gift_token: None,
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap()
    }

    #[test]
    fn valid_code_passes() {
        let service = Uuid::new_v4();
        assert!(validate_session_code(&code(service, at()), service, at()).is_ok());
    }

    #[test]
    fn expired_code_is_rejected_even_if_unused() {
        let service = Uuid::new_v4();
        let mut c = code(service, at());
        c.expires_at = at() - Duration::days(1);
        assert!(!c.is_used);
        assert_eq!(validate_session_code(&c, service, at()), Err(Rejection::CodeExpired));
    }

    #[test]
    fn used_code_is_rejected_regardless_of_service() {
        let service = Uuid::new_v4();
        let mut c = code(service, at());
        c.is_used = true;
        assert_eq!(validate_session_code(&c, service, at()), Err(Rejection::CodeUsed));
        assert_eq!(
            validate_session_code(&c, Uuid::new_v4(), at()),
            Err(Rejection::CodeUsed)
        );
    }

    #[test]
    fn wrong_service_is_rejected() {
        let service = Uuid::new_v4();
        let c = code(service, at());
        assert_eq!(
            validate_session_code(&c, Uuid::new_v4(), at()),
            Err(Rejection::CodeNotApplicable)
        );
    }
}
