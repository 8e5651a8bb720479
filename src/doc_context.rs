#[derive(Debug, Clone)]
pub struct DocContext {
    pub page_number: usize,
    pub template_name: String,
    /// Number of columns the page template lays out.
    pub frame_count: usize,
}

impl DocContext {
    pub fn new(page_number: usize, template_name: impl Into<String>, frame_count: usize) -> Self {
        Self {
            page_number,
            template_name: template_name.into(),
            frame_count,
        }
    }
}
