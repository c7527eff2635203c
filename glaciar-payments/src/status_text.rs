use glaciar_core::booking::BookingStatus;
use glaciar_core::package::OrderStatus;

/// User-facing, Spanish-language explanation of a gateway rejection
/// `status_detail` code. Unknown codes get the generic fallback.
pub fn rejection_detail_text(detail: &str) -> &'static str {
    match detail {
        "cc_rejected_insufficient_amount" => "La tarjeta no tiene fondos suficientes.",
        "cc_rejected_bad_filled_security_code" => "El código de seguridad es incorrecto.",
        "cc_rejected_bad_filled_date" => "La fecha de vencimiento es incorrecta.",
        "cc_rejected_bad_filled_card_number" => "El número de tarjeta es incorrecto.",
        "cc_rejected_bad_filled_other" => "Algún dato de la tarjeta es incorrecto.",
        "cc_rejected_call_for_authorize" => {
            "Debes autorizar el pago con el emisor de tu tarjeta."
        }
        "cc_rejected_card_disabled" => "La tarjeta está inhabilitada. Contacta a tu banco.",
        "cc_rejected_duplicated_payment" => "Ya realizaste un pago por este monto.",
        "cc_rejected_high_risk" => "El pago fue rechazado por seguridad. Intenta otro medio.",
        "cc_rejected_max_attempts" => "Superaste el número de intentos permitidos.",
        "cc_rejected_blacklist" => "El pago no pudo ser procesado. Intenta otro medio.",
        _ => "El pago fue rechazado. Intenta nuevamente u ocupa otro medio de pago.",
    }
}

/// Sanitized, human-readable order status for the public status endpoint.
pub fn order_status_message(status: OrderStatus, status_detail: Option<&str>) -> String {
    match status {
        OrderStatus::Created => "Tu compra fue registrada y espera el pago.".to_string(),
        OrderStatus::PendingPayment => {
            "Tu pago está siendo procesado. Te avisaremos por correo.".to_string()
        }
        OrderStatus::Paid => {
            "¡Pago confirmado! Revisa tu correo: ahí van tus códigos de sesión.".to_string()
        }
        OrderStatus::Failed => match status_detail {
            Some(detail) => rejection_detail_text(detail).to_string(),
            None => "El pago no pudo completarse.".to_string(),
        },
        OrderStatus::Cancelled => "La compra fue cancelada.".to_string(),
    }
}

pub fn booking_status_message(status: BookingStatus, status_detail: Option<&str>) -> String {
    match status {
        BookingStatus::PendingPayment => {
            "Tu reserva espera la confirmación del pago.".to_string()
        }
        BookingStatus::Confirmed => "¡Reserva confirmada! Te esperamos.".to_string(),
        BookingStatus::Cancelled => match status_detail {
            Some(detail) => rejection_detail_text(detail).to_string(),
            None => "La reserva fue cancelada.".to_string(),
        },
        BookingStatus::Completed => "La sesión ya fue realizada.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_detail_translates() {
        assert_eq!(
            rejection_detail_text("cc_rejected_insufficient_amount"),
            "La tarjeta no tiene fondos suficientes."
        );
    }

    #[test]
    fn unknown_detail_gets_generic_text() {
        let text = rejection_detail_text("cc_rejected_some_future_code");
        assert!(text.contains("rechazado"));
    }

    #[test]
    fn failed_order_uses_detail_translation() {
        let msg = order_status_message(
            OrderStatus::Failed,
            Some("cc_rejected_call_for_authorize"),
        );
        assert!(msg.contains("autorizar"));
    }
}
