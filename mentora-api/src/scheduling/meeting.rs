use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

const SUFFIX_LEN: usize = 9;

/// Builds a fresh meeting link for every booked session.
#[derive(Debug, Clone)]
pub struct MeetingLinks {
    base_url: String,
}

impl MeetingLinks {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }

    /// `{base}?pwd={unix millis}{random suffix}`.
    pub fn generate(&self) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{separator}pwd={}{suffix}",
            self.base_url,
            Utc::now().timestamp_millis()
        )
    }
}
