//! Browser impersonation: user agents and the default header table.

use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};

const ANDROID_VERSIONS: &[&str] = &["10", "11", "12", "13", "14"];

const ANDROID_DEVICES: &[&str] = &[
    "SM-G991B",
    "SM-S918B",
    "SM-A536B",
    "Pixel 6",
    "Pixel 7 Pro",
    "Pixel 8",
    "2201116SG",
    "M2101K6G",
    "CPH2451",
    "RMX3363",
];

const CHROME_MAJORS: std::ops::RangeInclusive<u32> = 114..=130;

/// Generates an Android Chrome user agent with a random device and build.
pub fn random_android_chrome<R: Rng + ?Sized>(rng: &mut R) -> String {
    let android = ANDROID_VERSIONS.choose(&mut *rng).copied().unwrap_or("13");
    let device = ANDROID_DEVICES.choose(&mut *rng).copied().unwrap_or("Pixel 7");
    let major = rng.gen_range(CHROME_MAJORS);
    let build = rng.gen_range(5000..=6800);
    let patch = rng.gen_range(0..=250);

    format!(
        "Mozilla/5.0 (Linux; Android {android}; {device}) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/{major}.0.{build}.{patch} Mobile Safari/537.36"
    )
}

/// Headers the Telegram Android web view sends with every request.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("empty"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("cors"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-site"),
    );
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("org.telegram.messenger"),
    );
    headers
}
