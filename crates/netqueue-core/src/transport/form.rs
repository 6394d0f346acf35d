//! Outgoing multipart form payload.

/// One part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    /// Plain text field.
    Field { name: String, value: String },
    /// In-memory file attachment.
    File {
        name: String,
        filename: String,
        content_type: Option<String>,
        data: Vec<u8>,
    },
}

/// Ordered multipart form, sent as `multipart/form-data`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    parts: Vec<FormPart>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Field {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a file part with the given filename and contents.
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            filename: filename.into(),
            content_type: None,
            data,
        });
        self
    }

    /// Set the content type of the most recently added file part.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        if let Some(FormPart::File {
            content_type: slot, ..
        }) = self.parts.last_mut()
        {
            *slot = Some(content_type.into());
        }
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Total bytes of field values and file contents (excluding multipart framing).
    pub fn payload_len(&self) -> usize {
        self.parts
            .iter()
            .map(|p| match p {
                FormPart::Field { value, .. } => value.len(),
                FormPart::File { data, .. } => data.len(),
            })
            .sum()
    }

    /// Build the libcurl representation of this form.
    pub(super) fn to_curl(&self) -> Result<curl::easy::Form, curl::FormError> {
        let mut form = curl::easy::Form::new();
        for part in &self.parts {
            match part {
                FormPart::Field { name, value } => {
                    form.part(name).contents(value.as_bytes()).add()?;
                }
                FormPart::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    let mut p = form.part(name);
                    p.buffer(filename, data.clone());
                    if let Some(ct) = content_type {
                        p.content_type(ct);
                    }
                    p.add()?;
                }
            }
        }
        Ok(form)
    }
}
