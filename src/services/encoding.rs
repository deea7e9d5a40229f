use chardetng::EncodingDetector;
use encoding_rs::UTF_8;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug)]
pub struct DecodedText {
    pub text: String,
    pub encoding: String,
    pub had_errors: bool,
}

/// Decodes an exported text file. Spreadsheet exports of the microcopy
/// table are not always UTF-8, and Dutch copy carries diacritics (é, ë, ï),
/// so the encoding is guessed when there is no BOM.
pub fn decode(bytes: &[u8]) -> DecodedText {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        let (text, had_errors) = UTF_8.decode_without_bom_handling(rest);
        return DecodedText {
            text: text.into_owned(),
            encoding: "utf-8-sig".into(),
            had_errors,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);

    let encoding = detector.guess(None, true);
    let (text, _, had_errors) = encoding.decode(bytes);

    DecodedText {
        text: text.into_owned(),
        encoding: encoding.name().to_lowercase(),
        had_errors,
    }
}
