// simple exponential backoff: 2^attempt * 10 seconds
#[must_use]
pub fn backoff_seconds(attempts: i32) -> i64 {
    #[allow(clippy::cast_sign_loss)]
    let secs = 10 * (2_i64.pow(attempts.max(0) as u32));
    secs.min(3600) // cap at 1h
}

#[cfg(test)]
mod tests {
    use super::backoff_seconds;

    #[test]
    fn doubles_per_attempt_and_caps() {
        assert_eq!(backoff_seconds(0), 10);
        assert_eq!(backoff_seconds(1), 20);
        assert_eq!(backoff_seconds(2), 40);
        assert_eq!(backoff_seconds(30), 3600);
    }
}
