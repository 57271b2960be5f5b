//! Emergency alert email rendering: subject, plain text, HTML.

use crate::domain::{Coordinates, HealthProfile, OutgoingEmail, User};

/// Minimal escaping for user-supplied text placed in HTML.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// (label, value) lines for the health section. Empty lists are skipped.
fn health_lines(health: &HealthProfile) -> Vec<(&'static str, String)> {
    let mut lines = Vec::new();
    if !health.health_conditions.is_empty() {
        lines.push(("Medical Conditions", health.health_conditions.join(", ")));
    }
    if !health.allergies.is_empty() {
        lines.push(("Known Allergies", health.allergies.join(", ")));
    }
    if let Some(blood) = health.blood_type.as_deref().filter(|b| !b.is_empty()) {
        lines.push(("Blood Type", blood.to_string()));
    }
    if !health.current_medications.is_empty() {
        let meds: Vec<String> = health
            .current_medications
            .iter()
            .map(|m| format!("{} {}", m.name, m.dosage))
            .collect();
        lines.push(("Current Medications", meds.join(", ")));
    }
    lines
}

pub fn alert_subject(user_name: &str) -> String {
    format!("🚨 URGENT: Medical Alert from {} via MediTracker", user_name)
}

/// Render the alert sent to one emergency contact.
pub fn render_alert(
    to_name: &str,
    to_email: &str,
    user: &User,
    transcription: Option<&str>,
    coordinates: Option<Coordinates>,
) -> OutgoingEmail {
    let user_name = user.display_name();
    let health = user
        .profile
        .health_profile
        .as_ref()
        .map(health_lines)
        .unwrap_or_default();
    let message = transcription.map(str::trim).filter(|t| !t.is_empty());

    // Plain text
    let mut text = format!(
        "URGENT MEDICAL ALERT: {user} Needs Immediate Assistance\n\n\
         Dear {to},\n\n\
         This is an EMERGENCY alert from MediTracker. {user} has triggered their emergency \
         alert system and requires immediate assistance.\n\n",
        user = user_name,
        to = to_name
    );
    if let Some(m) = message {
        text.push_str(&format!("EMERGENCY MESSAGE:\n{}\n\n", m));
    }
    if !health.is_empty() {
        text.push_str("HEALTH INFORMATION:\n");
        for (label, value) in &health {
            text.push_str(&format!("- {}: {}\n", label, value));
        }
        text.push('\n');
    }
    if let Some(c) = coordinates {
        text.push_str(&format!("LOCATION: {}\n\n", c.maps_url()));
    }
    text.push_str(
        "IMPORTANT: This is a legitimate emergency alert from MediTracker's Emergency Response System.\n\
         If you received this message, you are registered as an emergency contact.\n",
    );

    // HTML
    let user_html = escape_html(&user_name);
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\"><title>Emergency Alert</title></head>\n");
    html.push_str("<body style=\"font-family: Helvetica, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;\">\n");
    html.push_str(&format!(
        "<div style=\"background-color: #d32f2f; color: white; padding: 20px; border-radius: 10px; text-align: center;\">\
         <h1 style=\"margin: 0;\">🚨 EMERGENCY ALERT 🚨</h1>\
         <p style=\"font-size: 20px; margin: 10px 0 0;\">{} Needs Immediate Help</p></div>\n",
        user_html
    ));
    html.push_str(&format!(
        "<p>Dear {},</p>\n<p style=\"background-color: #ffebee; padding: 15px; border-radius: 5px;\">\
         This is an <strong>EMERGENCY ALERT</strong>. {} has activated their emergency response system \
         and requires immediate assistance.</p>\n",
        escape_html(to_name),
        user_html
    ));
    if let Some(m) = message {
        html.push_str(&format!(
            "<div style=\"background-color: #fff3e0; padding: 15px; border-left: 4px solid #ff9800;\">\
             <h3 style=\"color: #e65100; margin-top: 0;\">📝 Emergency Message</h3>\
             <p style=\"font-style: italic;\">\"{}\"</p></div>\n",
            escape_html(m)
        ));
    }
    if !health.is_empty() {
        html.push_str(
            "<div style=\"background-color: #e8f5e9; padding: 15px; border-left: 4px solid #388e3c;\">\
             <h3 style=\"color: #1b5e20; margin-top: 0;\">🏥 Important Health Information</h3><ul>",
        );
        for (label, value) in &health {
            html.push_str(&format!(
                "<li><strong>{}:</strong> {}</li>",
                label,
                escape_html(value)
            ));
        }
        html.push_str("</ul></div>\n");
    }
    if let Some(c) = coordinates {
        html.push_str(&format!(
            "<div><h3 style=\"color: #d32f2f;\">📍 Last Known Location</h3>\
             <a href=\"{url}\" target=\"_blank\" style=\"background-color: #1976d2; color: white; padding: 10px 20px; text-decoration: none; border-radius: 5px;\">\
             View Location on Google Maps</a>\
             <p style=\"color: #555;\">GPS Coordinates: {lat}, {lng}</p></div>\n",
            url = c.maps_url(),
            lat = c.latitude,
            lng = c.longitude
        ));
    }
    html.push_str(
        "<div style=\"background-color: #f5f5f5; padding: 20px; border-radius: 5px; margin-top: 30px;\">\
         <p style=\"color: #666; font-size: 14px;\">This is an automated emergency alert from the MediTracker Emergency Response System.</p>\
         <p style=\"color: #d32f2f; font-weight: bold;\">Please respond immediately if you can assist.</p>\
         <p style=\"color: #666; font-size: 12px;\">You are receiving this because you are registered as an emergency contact.</p></div>\n",
    );
    html.push_str("</body>\n</html>\n");

    OutgoingEmail {
        to_name: to_name.to_string(),
        to_email: to_email.to_string(),
        subject: alert_subject(&user_name),
        text,
        html,
    }
}

/// Short reminder email sent to the user themselves.
pub fn render_reminder(user: &User, name: &str, dosage: &str, time: &str) -> OutgoingEmail {
    let text = format!(
        "Hi {},\n\nIt's time to take {} ({}) scheduled for {}.\n\nMark it as taken in MediTracker once done.\n",
        user.display_name(),
        name,
        dosage,
        time
    );
    let html = format!(
        "<p>Hi {},</p><p>It's time to take <strong>{}</strong> ({}) scheduled for {}.</p>\
         <p>Mark it as taken in MediTracker once done.</p>",
        escape_html(&user.display_name()),
        escape_html(name),
        escape_html(dosage),
        escape_html(time)
    );
    OutgoingEmail {
        to_name: user.display_name(),
        to_email: user.email.clone(),
        subject: format!("Medicine reminder: {} at {}", name, time),
        text,
        html,
    }
}
