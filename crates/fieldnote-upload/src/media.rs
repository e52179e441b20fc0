use bytes::Bytes;

/// Audio containers the backend accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    M4a,
    Aac,
    Ogg,
}

impl AudioFormat {
    pub const ALL: [Self; 5] = [Self::Mp3, Self::Wav, Self::M4a, Self::Aac, Self::Ogg];

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::M4a => "m4a",
            Self::Aac => "aac",
            Self::Ogg => "ogg",
        }
    }

    /// Media type sent alongside this format
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::M4a => "audio/m4a",
            Self::Aac => "audio/aac",
            Self::Ogg => "audio/ogg",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    /// Best-effort format guess from a declared type and filename
    ///
    /// Checked in order ogg, wav, mp3, aac; anything unrecognized is
    /// treated as m4a, which is what most mobile recorders produce.
    pub fn infer(content_type: Option<&str>, filename: &str) -> Self {
        let hay = format!("{} {filename}", content_type.unwrap_or_default()).to_ascii_lowercase();

        if hay.contains("ogg") {
            Self::Ogg
        } else if hay.contains("wav") {
            Self::Wav
        } else if hay.contains("mp3") || hay.contains("mpeg") {
            Self::Mp3
        } else if hay.contains("aac") {
            Self::Aac
        } else {
            Self::M4a
        }
    }
}

/// Recorded audio as handed over by the capture surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Bytes,
    /// Declared media type; recorders frequently get this wrong or omit it
    pub content_type: Option<String>,
    pub filename: String,
}

impl AudioClip {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<String>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
            filename: filename.into(),
        }
    }

    /// Format when both the extension and declared type already agree on a
    /// known format
    pub fn known_format(&self) -> Option<AudioFormat> {
        let format = extension(&self.filename).and_then(AudioFormat::from_extension)?;
        let declared = self.content_type.as_deref()?.split(';').next()?.trim();
        declared.eq_ignore_ascii_case(format.mime()).then_some(format)
    }

    /// Re-wrap the clip under a safe media type and filename
    ///
    /// A clip whose extension and declared type already match a known
    /// format is returned unchanged. Never fails.
    #[must_use]
    pub fn normalized(self) -> Self {
        if self.known_format().is_some() {
            return self;
        }

        let format = AudioFormat::infer(self.content_type.as_deref(), &self.filename);
        let filename = format!("{}.{}", stem(&self.filename), format.extension());

        tracing::debug!(
            from_type = ?self.content_type,
            from_name = %self.filename,
            to_name = %filename,
            "normalized audio clip"
        );

        Self {
            bytes: self.bytes,
            content_type: Some(format.mime().to_owned()),
            filename,
        }
    }

    /// Declared type, falling back to the inferred one
    pub fn effective_content_type(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| AudioFormat::infer(None, &self.filename).mime().to_owned())
    }
}

/// Still image attached to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub bytes: Bytes,
    pub filename: String,
    pub content_type: Option<String>,
}

impl ImageFile {
    pub fn new(bytes: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            content_type: None,
        }
    }

    /// Declared type, else guessed from the filename
    pub fn effective_content_type(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| guess_content_type(&self.filename))
    }
}

/// Media type guessed from a filename, `application/octet-stream` when unknown
pub fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename).first_or_octet_stream().essence_str().to_owned()
}

fn base_name(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename).trim()
}

fn extension(filename: &str) -> Option<&str> {
    let name = base_name(filename);
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => Some(&name[idx + 1..]),
        _ => None,
    }
}

fn stem(filename: &str) -> &str {
    let name = base_name(filename);
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };

    if stem.is_empty() { "recording" } else { stem }
}
