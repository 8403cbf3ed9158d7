//! Closed content-type code table for stored objects.
//!
//! The metadata index stores an integer code instead of a free-form MIME
//! string to keep the column compact and indexable. Both directions of the
//! mapping are total: unknown MIME strings encode to `OctetStream`, and
//! unknown codes decode to `OctetStream`, so an upload never fails merely
//! because its MIME type is unrecognized. The lossy mapping is deliberate.

/// Content type of a stored object, persisted as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    // Default / unknown
    OctetStream,
    // Text
    TextPlain,
    TextHtml,
    TextCss,
    TextJavascript,
    TextCsv,
    TextXml,
    // Images
    ImageJpeg,
    ImagePng,
    ImageGif,
    ImageWebp,
    ImageSvg,
    ImageBmp,
    ImageIco,
    // Audio
    AudioMpeg,
    AudioOgg,
    AudioWav,
    AudioWebm,
    // Video
    VideoMp4,
    VideoOgg,
    VideoWebm,
    VideoQuicktime,
    // Application
    ApplicationJson,
    ApplicationXml,
    ApplicationPdf,
    ApplicationZip,
    ApplicationGzip,
    ApplicationTar,
    // Office documents
    MsWord,
    MsExcel,
    MsPowerpoint,
    OpenXmlDocument,
    OpenXmlSheet,
    OpenXmlPresentation,
}

impl ContentType {
    /// Integer code stored in the metadata index. Codes are grouped in
    /// blocks of ten per family and must never be renumbered.
    pub fn code(self) -> i64 {
        match self {
            Self::OctetStream => 0,
            Self::TextPlain => 1,
            Self::TextHtml => 2,
            Self::TextCss => 3,
            Self::TextJavascript => 4,
            Self::TextCsv => 5,
            Self::TextXml => 6,
            Self::ImageJpeg => 10,
            Self::ImagePng => 11,
            Self::ImageGif => 12,
            Self::ImageWebp => 13,
            Self::ImageSvg => 14,
            Self::ImageBmp => 15,
            Self::ImageIco => 16,
            Self::AudioMpeg => 20,
            Self::AudioOgg => 21,
            Self::AudioWav => 22,
            Self::AudioWebm => 23,
            Self::VideoMp4 => 30,
            Self::VideoOgg => 31,
            Self::VideoWebm => 32,
            Self::VideoQuicktime => 33,
            Self::ApplicationJson => 40,
            Self::ApplicationXml => 41,
            Self::ApplicationPdf => 42,
            Self::ApplicationZip => 43,
            Self::ApplicationGzip => 44,
            Self::ApplicationTar => 45,
            Self::MsWord => 50,
            Self::MsExcel => 51,
            Self::MsPowerpoint => 52,
            Self::OpenXmlDocument => 53,
            Self::OpenXmlSheet => 54,
            Self::OpenXmlPresentation => 55,
        }
    }

    /// Decode a stored code. Unknown codes fall back to `OctetStream`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::TextPlain,
            2 => Self::TextHtml,
            3 => Self::TextCss,
            4 => Self::TextJavascript,
            5 => Self::TextCsv,
            6 => Self::TextXml,
            10 => Self::ImageJpeg,
            11 => Self::ImagePng,
            12 => Self::ImageGif,
            13 => Self::ImageWebp,
            14 => Self::ImageSvg,
            15 => Self::ImageBmp,
            16 => Self::ImageIco,
            20 => Self::AudioMpeg,
            21 => Self::AudioOgg,
            22 => Self::AudioWav,
            23 => Self::AudioWebm,
            30 => Self::VideoMp4,
            31 => Self::VideoOgg,
            32 => Self::VideoWebm,
            33 => Self::VideoQuicktime,
            40 => Self::ApplicationJson,
            41 => Self::ApplicationXml,
            42 => Self::ApplicationPdf,
            43 => Self::ApplicationZip,
            44 => Self::ApplicationGzip,
            45 => Self::ApplicationTar,
            50 => Self::MsWord,
            51 => Self::MsExcel,
            52 => Self::MsPowerpoint,
            53 => Self::OpenXmlDocument,
            54 => Self::OpenXmlSheet,
            55 => Self::OpenXmlPresentation,
            _ => Self::OctetStream,
        }
    }

    /// Encode a MIME string. The input is lowercased and any parameter
    /// suffix (`; charset=...`) is stripped before lookup. Unknown types
    /// map to `OctetStream`.
    pub fn from_mime(mime: &str) -> Self {
        let normalized = mime
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "text/plain" => Self::TextPlain,
            "text/html" => Self::TextHtml,
            "text/css" => Self::TextCss,
            "text/javascript" => Self::TextJavascript,
            "text/csv" => Self::TextCsv,
            "text/xml" => Self::TextXml,
            "image/jpeg" | "image/jpg" => Self::ImageJpeg,
            "image/png" => Self::ImagePng,
            "image/gif" => Self::ImageGif,
            "image/webp" => Self::ImageWebp,
            "image/svg+xml" => Self::ImageSvg,
            "image/bmp" => Self::ImageBmp,
            "image/x-icon" => Self::ImageIco,
            "audio/mpeg" => Self::AudioMpeg,
            "audio/ogg" => Self::AudioOgg,
            "audio/wav" => Self::AudioWav,
            "audio/webm" => Self::AudioWebm,
            "video/mp4" => Self::VideoMp4,
            "video/ogg" => Self::VideoOgg,
            "video/webm" => Self::VideoWebm,
            "video/quicktime" => Self::VideoQuicktime,
            "application/json" => Self::ApplicationJson,
            "application/xml" => Self::ApplicationXml,
            "application/pdf" => Self::ApplicationPdf,
            "application/zip" => Self::ApplicationZip,
            "application/gzip" => Self::ApplicationGzip,
            "application/x-tar" => Self::ApplicationTar,
            "application/msword" => Self::MsWord,
            "application/vnd.ms-excel" => Self::MsExcel,
            "application/vnd.ms-powerpoint" => Self::MsPowerpoint,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Self::OpenXmlDocument
            }
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Self::OpenXmlSheet
            }
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                Self::OpenXmlPresentation
            }
            _ => Self::OctetStream,
        }
    }

    /// Canonical MIME string for this content type.
    pub fn as_mime(self) -> &'static str {
        match self {
            Self::OctetStream => "application/octet-stream",
            Self::TextPlain => "text/plain",
            Self::TextHtml => "text/html",
            Self::TextCss => "text/css",
            Self::TextJavascript => "text/javascript",
            Self::TextCsv => "text/csv",
            Self::TextXml => "text/xml",
            Self::ImageJpeg => "image/jpeg",
            Self::ImagePng => "image/png",
            Self::ImageGif => "image/gif",
            Self::ImageWebp => "image/webp",
            Self::ImageSvg => "image/svg+xml",
            Self::ImageBmp => "image/bmp",
            Self::ImageIco => "image/x-icon",
            Self::AudioMpeg => "audio/mpeg",
            Self::AudioOgg => "audio/ogg",
            Self::AudioWav => "audio/wav",
            Self::AudioWebm => "audio/webm",
            Self::VideoMp4 => "video/mp4",
            Self::VideoOgg => "video/ogg",
            Self::VideoWebm => "video/webm",
            Self::VideoQuicktime => "video/quicktime",
            Self::ApplicationJson => "application/json",
            Self::ApplicationXml => "application/xml",
            Self::ApplicationPdf => "application/pdf",
            Self::ApplicationZip => "application/zip",
            Self::ApplicationGzip => "application/gzip",
            Self::ApplicationTar => "application/x-tar",
            Self::MsWord => "application/msword",
            Self::MsExcel => "application/vnd.ms-excel",
            Self::MsPowerpoint => "application/vnd.ms-powerpoint",
            Self::OpenXmlDocument => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::OpenXmlSheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            Self::OpenXmlPresentation => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_mime_round_trips() {
        for mime in ["text/plain", "image/png", "application/pdf", "video/mp4"] {
            let ct = ContentType::from_mime(mime);
            assert_eq!(ct.as_mime(), mime);
            assert_eq!(ContentType::from_code(ct.code()), ct);
        }
    }

    #[test]
    fn unknown_mime_falls_back_to_octet_stream() {
        assert_eq!(
            ContentType::from_mime("application/x-made-up"),
            ContentType::OctetStream
        );
        assert_eq!(ContentType::from_mime(""), ContentType::OctetStream);
    }

    #[test]
    fn charset_suffix_is_stripped() {
        assert_eq!(
            ContentType::from_mime("text/plain; charset=utf-8"),
            ContentType::TextPlain
        );
        assert_eq!(
            ContentType::from_mime("TEXT/HTML;charset=ISO-8859-1"),
            ContentType::TextHtml
        );
    }

    #[test]
    fn jpg_aliases_jpeg() {
        assert_eq!(ContentType::from_mime("image/jpg"), ContentType::ImageJpeg);
    }

    #[test]
    fn unknown_code_decodes_to_octet_stream() {
        assert_eq!(ContentType::from_code(999), ContentType::OctetStream);
        assert_eq!(ContentType::from_code(-1), ContentType::OctetStream);
        assert_eq!(ContentType::from_code(7), ContentType::OctetStream);
    }
}
