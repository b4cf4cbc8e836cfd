/*!
 * Transcript assembly.
 *
 * The body holds the document text exactly as extracted. Image descriptions
 * are kept apart and rendered after the body, one line per image, in page
 * order.
 */

use std::fmt;

/// Description of one embedded image, tagged with its page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageNote {
    /// 1-based page holding the image
    pub page_number: u32,
    /// Text produced by the describer
    pub description: String,
}

impl ImageNote {
    /// Create a note for an image on `page_number`
    pub fn new(page_number: u32, description: impl Into<String>) -> Self {
        Self {
            page_number,
            description: description.into(),
        }
    }

    /// Rendered transcript line
    pub fn line(&self) -> String {
        format!("Image on page {}: {}", self.page_number, self.description)
    }
}

/// Merged text submitted for speech synthesis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    body: String,
    image_notes: Vec<ImageNote>,
}

impl Transcript {
    /// Transcript made of body text only
    pub fn from_body(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            image_notes: Vec::new(),
        }
    }

    /// Append an image note; callers push notes in page order
    pub fn push_note(&mut self, note: ImageNote) {
        self.image_notes.push(note);
    }

    /// Document text without image descriptions
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Image notes in page order
    pub fn image_notes(&self) -> &[ImageNote] {
        &self.image_notes
    }

    /// Whether there is nothing worth speaking
    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty() && self.image_notes.iter().all(|n| n.description.trim().is_empty())
    }

    /// Full transcript text
    pub fn render(&self) -> String {
        if self.image_notes.is_empty() {
            return self.body.clone();
        }

        let lines = self
            .image_notes
            .iter()
            .map(ImageNote::line)
            .collect::<Vec<_>>()
            .join("\n");

        if self.body.trim().is_empty() {
            lines
        } else {
            format!("{}\n\n{}", self.body.trim_end(), lines)
        }
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
