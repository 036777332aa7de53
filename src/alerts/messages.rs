use crate::models::{ReportRecord, RiskLevel};

pub const ALERT_SUBJECT: &str = "Urgent Health Alert";

pub fn email_subject(level: RiskLevel) -> String {
    format!("{ALERT_SUBJECT}: {level} risk detected")
}

pub fn email_body(report: &ReportRecord, level: RiskLevel) -> String {
    format!(
        "Dear patient,\n\n\
         Your recent health report ({file}) has been analyzed and indicates a {level} \
         health risk.\n\n\
         Please consult your doctor as soon as possible.\n\n\
         Report reference: {id}\n",
        file = report.file_name,
        id = report.id,
    )
}

/// Short enough for a single SMS segment.
pub fn sms_body(level: RiskLevel) -> String {
    format!("{ALERT_SUBJECT}: your latest report shows {level} risk. Please consult your doctor.")
}
