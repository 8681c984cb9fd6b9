/// Options for writing ToUnicode CMaps
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Emit the DSC comments of a standalone CMap resource file
    /// (`%!PS-Adobe-3.0 Resource-CMap` ... `%%EOF`).
    pub comments: bool,

    /// Value of `/CMapVersion`, omitted if `None`
    pub cmap_version: Option<f64>,
}

impl WriteOptions {
    /// Create a builder for WriteOptions
    pub fn builder() -> WriteOptionsBuilder {
        WriteOptionsBuilder::default()
    }
}

/// Builder for WriteOptions
#[derive(Default)]
pub struct WriteOptionsBuilder {
    comments: bool,
    cmap_version: Option<f64>,
}

impl WriteOptionsBuilder {
    /// Enable or disable the resource file comments
    pub fn comments(mut self, value: bool) -> Self {
        self.comments = value;
        self
    }

    /// Set the CMap version
    pub fn cmap_version(mut self, value: f64) -> Self {
        self.cmap_version = Some(value);
        self
    }

    /// Build the WriteOptions
    pub fn build(self) -> WriteOptions {
        WriteOptions {
            comments: self.comments,
            cmap_version: self.cmap_version.filter(|version| version.is_finite()),
        }
    }
}
