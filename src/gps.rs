//! GPS simulation entry point.

/// Reserved for GPS position replay; currently does nothing.
pub async fn simulate_gps() {}
