use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

const PREFIX: &str = "booking_";
const SUFFIX_LEN: usize = 6;

/// Generate a booking id of the form `booking_<unix-seconds>_<6 alphanumerics>`.
pub fn generate_booking_id_at(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}{}_{}", PREFIX, now.timestamp(), suffix)
}

/// Check that `id` has the shape produced by [`generate_booking_id_at`].
pub fn is_booking_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix(PREFIX) else {
        return false;
    };
    let Some((seconds, suffix)) = rest.split_once('_') else {
        return false;
    };

    !seconds.is_empty()
        && seconds.bytes().all(|b| b.is_ascii_digit())
        && suffix.len() == SUFFIX_LEN
        && suffix.bytes().all(|b| b.is_ascii_alphanumeric())
}
