//! Built-in normalization resources.
//!
//! Loading these tables from external files is a deployment concern that
//! lives outside the engine; the engine ships working defaults and accepts
//! replacements at construction. All keys are matched lowercased.

use std::collections::HashMap;

/// Strong non-electronics signals (food, household, beauty). Each hit counts
/// against the electronics score during domain detection.
pub const NON_IT_STRONG: &[&str] = &[
    "라면", "컵라면", "과자", "김치", "참치", "햇반", "우유", "커피", "소스", "간장",
    "된장", "고추장", "샴푸", "린스", "바디", "세제", "치약", "마스크팩", "화장품",
];

/// Food-domain signals.
pub const FOOD_SIGNALS: &[&str] = &[
    "라면", "컵라면", "과자", "김치", "참치", "햇반", "우유", "커피", "소스", "간장",
    "된장", "고추장", "시리얼", "음료",
];

/// Cosmetics-domain signals.
pub const COSMETICS_SIGNALS: &[&str] = &[
    "샴푸", "린스", "바디", "로션", "세럼", "크림", "마스크팩", "화장품", "선크림", "클렌징",
];

/// Electronics signals: brands, product lines, spec vocabulary.
pub const IT_SIGNALS: &[&str] = &[
    "애플", "apple", "삼성", "lg", "샤오미", "노트북", "맥북", "아이폰", "아이패드",
    "갤럭시", "에어팟", "버즈", "태블릿", "스마트폰", "이어폰", "헤드폰", "모니터",
    "그래픽", "rtx", "gtx", "ssd", "usb", "type-c", "usb-c", "m1", "m2", "m3", "m4",
    "m5", "intel", "i3", "i5", "i7", "i9", "ryzen",
];

/// Color tokens, removable under the electronics domain and used for
/// color–Hangul boundary insertion everywhere.
pub const COLORS: &[&str] = &[
    "화이트", "블랙", "실버", "골드", "그레이", "블루", "핑크", "레드", "그린", "퍼플",
    "로즈", "샴페인", "뉴트럼", "차콜", "브론즈", "건메탈",
];

/// Accessory keywords: a candidate title carrying these (and sharing none of
/// them with the query) is an accessory trap.
pub const ACCESSORY_KEYWORDS: &[&str] = &[
    "케이스", "커버", "키스킨", "스킨", "필름", "보호필름", "강화유리", "거치대",
    "스탠드", "파우치", "가방", "충전기", "어댑터", "케이블", "허브", "젠더", "독",
    "도킹", "키보드커버", "키보드덮개", "교체용", "전용", "호환", "리필", "리필용",
    "스티커", "보호", "케이스형", "키캡", "키패드", "스트랩",
];

/// Main-product hints: their presence in the query means the user wants the
/// device itself, arming the accessory trap.
pub const MAIN_PRODUCT_HINTS: &[&str] = &[
    "노트북", "랩탑", "맥북", "울트라북", "태블릿", "아이패드", "스마트폰", "핸드폰",
    "아이폰", "갤럭시", "모니터", "tv", "데스크탑", "본체", "카메라", "렌즈", "이어폰",
    "헤드폰", "스피커", "마우스",
];

/// Accessory keywords used by the listing-page filter; extends the trap set
/// with Latin spellings seen in mixed-script titles.
pub const LISTING_ACCESSORY_KEYWORDS: &[&str] = &[
    "케이스", "필름", "파우치", "키스킨", "충전기", "거치대", "스탠드", "가방", "커버",
    "보호필름", "강화유리", "어댑터", "케이블", "허브", "젠더", "독", "도킹", "스티커",
    "키캡", "글래스", "glass", "펜슬", "pencil", "펜", "pen", "키보드", "keyboard",
    "마우스", "mouse", "트랙패드", "trackpad", "실리콘", "silicon",
];

/// Known accessory-maker names. A detail-page title carrying one of these
/// without any shared main-product hint is skipped by the fast path.
pub const ACCESSORY_BRANDS: &[&str] = &[
    "슈피겐", "베루스", "링케", "신지모루", "엘라고", "스마트리", "esr", "elago",
    "ringke", "spigen",
];

/// Variant qualifiers whose disjointness penalizes a match.
pub const VARIANT_TOKENS: &[&str] = &["pro", "air", "max", "mini", "ultra", "fe"];

/// Model-code blacklist: spec/OS words that look like codes but are not.
pub const MODEL_CODE_BLACKLIST: &[&str] = &[
    "WIN10", "WIN11", "WINDOWS", "HOME", "PRO", "SSD", "HDD", "NVME", "RAM", "PCIE", "PCIe",
];

/// Korean→English substitution table for fallback search candidates.
#[must_use]
pub fn default_synonyms() -> Vec<(String, Vec<String>)> {
    [
        ("맥북", &["MacBook"][..]),
        ("아이폰", &["iPhone"]),
        ("아이패드", &["iPad"]),
        ("에어팟", &["AirPods"]),
        ("갤럭시", &["Galaxy"]),
        ("갤럭시버즈", &["Galaxy Buds"]),
        ("애플워치", &["Apple Watch"]),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
    .collect()
}

/// Hard mappings: canonical replacements for titles the pipeline otherwise
/// mangles. Keys are compared on the canonical lowercase form and by
/// substring, longest key first.
#[must_use]
pub fn default_hard_mappings() -> HashMap<String, String> {
    [
        ("에어팟 프로 2세대", "에어팟 프로 2"),
        ("버즈3 프로", "갤럭시 버즈3 프로"),
        ("아이패드 에어 11 m3", "아이패드 에어 11 M3"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Accessory keywords that suppress hard-mapping lookups: a query for a
/// case must never be rewritten into the device it fits.
pub const HARD_MAPPING_SKIP: &[&str] = &[
    "케이스", "필름", "커버", "충전기", "케이블", "거치대", "스탠드", "파우치",
    "스트랩", "독", "스킨", "case", "film", "cover", "charger", "cable", "stand",
    "pouch", "strap", "dock", "skin",
];

/// Category detection patterns for failure records, first match wins.
#[must_use]
pub fn default_category_patterns() -> Vec<(String, String)> {
    [
        ("laptop", r"(?i)노트북|맥북|랩탑|울트라북|laptop|macbook"),
        ("earbuds", r"(?i)에어팟|버즈|이어폰|earbuds|airpods"),
        ("phone", r"(?i)아이폰|갤럭시\s*[sz]|스마트폰|iphone"),
        ("tablet", r"(?i)아이패드|태블릿|갤럭시\s*탭|ipad"),
        ("monitor", r"(?i)모니터|monitor"),
        ("food", r"라면|과자|김치|참치|햇반|우유|커피"),
        ("beauty", r"샴푸|린스|로션|세럼|크림|마스크팩|화장품"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
