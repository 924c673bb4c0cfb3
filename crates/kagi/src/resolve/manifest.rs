use std::sync::LazyLock;

use dash_mpd::{ContentProtection, MPD};
use kagi_widevine::{constants::WIDEVINE_SCHEME_ID_URI, KeyId, PsshBox};
use quick_xml::{events::Event, Reader};
use regex::Regex;

static DEFAULT_KID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"default_KID="([0-9a-fA-F-]+)""#).unwrap());

/// Inline `cenc:pssh` of the first Widevine `ContentProtection`, as written in
/// the manifest.
pub fn resolve_explicit(manifest: &str) -> Option<String> {
    let mpd = match dash_mpd::parse(manifest) {
        Ok(mpd) => mpd,
        Err(e) => {
            log::debug!("Manifest is not a parsable MPD ({e}), scanning ContentProtection");
            return scan_explicit(manifest);
        }
    };

    let pssh = content_protections(&mpd)
        .filter(|protection| is_widevine_scheme(protection.schemeIdUri.as_deref()))
        .flat_map(|protection| protection.cenc_pssh.iter())
        .filter_map(|pssh| pssh.content.as_deref())
        .map(str::trim)
        .find(|pssh| !pssh.is_empty())
        .map(ToString::to_string);
    pssh
}

fn is_widevine_scheme(scheme: Option<&str>) -> bool {
    scheme.is_some_and(|uri| uri.trim().eq_ignore_ascii_case(WIDEVINE_SCHEME_ID_URI))
}

/// Walks `ContentProtection` elements only, for manifests the MPD model
/// rejects. Namespace prefixes are ignored.
fn scan_explicit(manifest: &str) -> Option<String> {
    let mut reader = Reader::from_str(manifest);
    let mut in_widevine = false;
    let mut in_pssh = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"ContentProtection" => {
                        let scheme = e
                            .attributes()
                            .flatten()
                            .find(|attr| local_name(attr.key.as_ref()) == b"schemeIdUri")
                            .and_then(|attr| attr.unescape_value().ok());
                        in_widevine = is_widevine_scheme(scheme.as_deref());
                    }
                    b"pssh" => in_pssh = in_widevine,
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"ContentProtection" => in_widevine = false,
                    b"pssh" => in_pssh = false,
                    _ => {}
                }
            }
            Ok(Event::Text(e)) if in_pssh => {
                if let Ok(text) = e.unescape() {
                    let text = text.trim();
                    if !text.is_empty() {
                        return Some(text.to_string());
                    }
                }
            }
            Ok(Event::Eof) => return None,
            Err(e) => {
                log::debug!("Manifest is not well-formed XML: {e}");
                return None;
            }
            _ => {}
        }
    }
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn content_protections(mpd: &MPD) -> impl Iterator<Item = &ContentProtection> {
    mpd.periods
        .iter()
        .flat_map(|period| period.adaptations.iter())
        .flat_map(|adaptation| {
            adaptation.ContentProtection.iter().chain(
                adaptation
                    .representations
                    .iter()
                    .flat_map(|representation| representation.ContentProtection.iter()),
            )
        })
}

/// Synthesizes a Widevine PSSH from the first `default_KID` attribute.
pub fn resolve_from_key_id(manifest: &str) -> Option<String> {
    let kid = DEFAULT_KID
        .captures_iter(manifest)
        .find_map(|captures| captures[1].parse::<KeyId>().ok())?;
    log::debug!("Generating PSSH from default_KID: {kid}");

    Some(PsshBox::from_key_id(&kid).to_base64())
}
