/// Sentiment classification attached to a summary by the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// The evolving structured-summary document reconstructed by the client.
///
/// Every field is independently optional until the service sets it. Once a
/// terminal event arrives the last snapshot becomes the final, frozen result.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StructuredSummary {
    /// Short title, typically 6-10 words.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Main summary, at most two sentences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_summary: Option<String>,
    /// Key takeaways in display order, typically 3-5 items.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,
    /// Content category label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Overall sentiment of the source content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    /// Estimated read time of the source content in minutes.
    #[serde(rename = "read_time_min", default, skip_serializing_if = "Option::is_none")]
    pub read_time_minutes: Option<u32>,
}

impl StructuredSummary {
    /// Returns true when no field has been populated yet.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.main_summary.is_none()
            && self.key_points.is_empty()
            && self.category.is_none()
            && self.sentiment.is_none()
            && self.read_time_minutes.is_none()
    }
}

/// Combines the current document with the snapshot carried by a patch event.
///
/// Every patch event carries an authoritative, complete snapshot of the
/// document, not a diff. Folding is therefore wholesale replacement: the
/// prior state never influences the result, which also makes re-applying any
/// event idempotent. The advisory `delta` on the event is never consulted
/// here.
pub fn fold(_current: StructuredSummary, snapshot: StructuredSummary) -> StructuredSummary {
    snapshot
}
