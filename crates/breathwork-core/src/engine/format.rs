/// Render seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_mm_ss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
