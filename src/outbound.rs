//! Outbound WhatsApp deep link for qualified leads.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

use crate::config::{ServiceConfig, ServiceType};
use crate::funnel::model::FormAnswers;

const WHATSAPP_BASE: &str = "https://wa.me/";

/// Characters left bare by `encodeURIComponent`; everything else is escaped.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Human-readable goal label; unknown values pass through.
pub fn goal_label(value: &str) -> &str {
    match value {
        "piezas_faltantes" => "Recuperar función (piezas faltantes)",
        "inestabilidad" => "Inestabilidad al masticar",
        "protesis" => "Mejorar prótesis actual",
        "evaluacion_implantes" => "Evaluación candidatura implantes",
        "armonica" => "Sonrisa armónica",
        "confianza" => "Mejorar confianza",
        "corregir" => "Corregir detalles",
        "no_seguro" => "Por definir",
        other => other,
    }
}

pub fn timeline_label(value: &str) -> &str {
    match value {
        "7-14" => "7-14 días",
        "este_mes" => "Este mes",
        "60_dias" => "60+ días",
        "no_seguro" => "Explorando",
        other => other,
    }
}

pub fn investment_label(value: &str) -> &str {
    match value {
        "3000_6000" => "$3k-$6k USD",
        "6000_12000" => "$6k-$12k USD",
        "12000_plus" => "$12k+ USD",
        "undisclosed" => "Por definir",
        "1500_3000" => "$1.5k-$3k USD",
        "6000_plus" => "$6k+ USD",
        other => other,
    }
}

/// Message body sent to the clinic, chosen by service.
pub fn whatsapp_message(service: &ServiceConfig, answers: &FormAnswers, short_id: &str) -> String {
    let first_name = answers.first_name.as_deref().unwrap_or_default();

    match service.service {
        ServiceType::Implants => {
            let goal = goal_label(answers.primary_goal.as_ref().map_or("", |g| g.as_str()));
            let timeline = timeline_label(answers.timeline.as_ref().map_or("", |t| t.as_str()));
            let investment = investment_label(
                answers
                    .investment_range
                    .as_ref()
                    .map_or("", |i| i.as_str()),
            );
            format!(
                "Hola, soy {first_name}. Postulé a evaluación de {name}.\n\n\
                 📋 Resumen:\n\
                 • Objetivo: {goal}\n\
                 • Plazo: {timeline}\n\
                 • Inversión estimada: {investment}\n\n\
                 ID: {short_id}\n\n\
                 ¿Tienen horas disponibles esta semana?",
                name = service.display_name,
            )
        }
        ServiceType::Aesthetic => format!(
            "Hola, soy {first_name}. Postulé a la evaluación de {name}. \
             ¿Me ayudan a agendar? ID: {short_id}",
            name = service.display_name,
        ),
    }
}

/// `https://wa.me/<number>?text=<encoded message>`.
///
/// The message is percent-encoded as a URI component, so spaces become `%20`.
pub fn whatsapp_link(number: &str, message: &str) -> Result<String, url::ParseError> {
    let base = Url::parse(WHATSAPP_BASE)?.join(number)?;
    let text = utf8_percent_encode(message, URI_COMPONENT);
    Ok(format!("{base}?text={text}"))
}
