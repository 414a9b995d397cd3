//! schema.org `ImageObject` records for the pictures of one document.
//!
//! Each record points at the picture's source rendered as a mid-sized JPEG,
//! which is what search engines index. Only the first `max_items` pictures
//! are described; the rest are dropped without notice.

use crate::config::JsonLdConfig;
use crate::picture::Picture;
use crate::proxy::{ProcessingOptions, Quality, UrlSigner};
use serde::Serialize;

const SCHEMA_CONTEXT: &str = "https://schema.org/";

/// Format of the `contentUrl` image.
const CONTENT_URL_EXT: &str = "jpg";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageObject {
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "@type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<Person>,
    #[serde(rename = "contentUrl")]
    pub content_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Person {
    #[serde(rename = "@type")]
    pub kind: &'static str,
    pub name: String,
}

/// Records for `pictures`, in order, at most `config.max_items` of them.
///
/// The content URL carries only the width and quality: cache busters and
/// crops of the directive are not applied.
pub fn json_ld(pictures: &[Picture], config: &JsonLdConfig, signer: &UrlSigner) -> Vec<ImageObject> {
    let creator = (!config.author.trim().is_empty()).then(|| Person {
        kind: "Person",
        name: config.author.clone(),
    });
    let options = ProcessingOptions::new().with("q", Quality::new(config.quality));
    pictures
        .iter()
        .take(config.max_items)
        .map(|picture| ImageObject {
            context: SCHEMA_CONTEXT,
            kind: "ImageObject",
            creator: creator.clone(),
            content_url: picture.resizes().fallback_url(
                signer,
                config.image_width,
                CONTENT_URL_EXT,
                &options,
            ),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picture::PictureSequence;
    use crate::proxy::ResizeSettings;
    use crate::test_helpers::{attrs, test_signer};

    fn pictures(count: usize) -> Vec<Picture> {
        let signer = test_signer();
        let settings = ResizeSettings::default();
        let mut seq = PictureSequence::new();
        for i in 0..count {
            let src = format!("img/{i}.jpg");
            seq.accept(attrs(&[("src", src.as_str())]), &signer, &settings);
        }
        seq.into_pictures()
    }

    fn config(author: &str) -> JsonLdConfig {
        JsonLdConfig {
            author: author.to_string(),
            ..JsonLdConfig::default()
        }
    }

    #[test]
    fn record_shape_matches_schema_org() {
        let records = json_ld(&pictures(1), &config("Jane Doe"), &test_signer());
        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["@context"], "https://schema.org/");
        assert_eq!(json["@type"], "ImageObject");
        assert_eq!(json["creator"]["@type"], "Person");
        assert_eq!(json["creator"]["name"], "Jane Doe");
        assert!(json["contentUrl"].as_str().unwrap().starts_with("https://img.example.com/"));
    }

    #[test]
    fn content_url_is_jpeg_at_configured_width() {
        let signer = test_signer().plain_source(true);
        let settings = ResizeSettings::default();
        let mut seq = PictureSequence::new();
        seq.accept(attrs(&[("src", "img/1.jpg"), ("v", "2")]), &signer, &settings);
        let records = json_ld(seq.pictures(), &config(""), &signer);
        assert!(
            records[0]
                .content_url
                .ends_with("/w:1000/q:80/plain/local:///photos/img/1.jpg@jpg")
        );
    }

    #[test]
    fn excess_records_are_dropped() {
        let records = json_ld(&pictures(12), &config("x"), &test_signer());
        assert_eq!(records.len(), 10);
        let custom = JsonLdConfig {
            max_items: 3,
            ..config("x")
        };
        assert_eq!(json_ld(&pictures(5), &custom, &test_signer()).len(), 3);
    }

    #[test]
    fn records_follow_document_order() {
        let signer = test_signer();
        let pics = pictures(3);
        let records = json_ld(&pics, &config("x"), &signer);
        for (record, picture) in records.iter().zip(&pics) {
            let expected = picture.resizes().fallback_url(
                &signer,
                1000,
                "jpg",
                &ProcessingOptions::new().with("q", 80),
            );
            assert_eq!(record.content_url, expected);
        }
    }

    #[test]
    fn creator_omitted_without_author() {
        let records = json_ld(&pictures(1), &config(""), &test_signer());
        let json = serde_json::to_value(&records[0]).unwrap();
        assert!(json.get("creator").is_none());
    }

    #[test]
    fn no_pictures_no_records() {
        assert!(json_ld(&[], &config("x"), &test_signer()).is_empty());
    }
}
