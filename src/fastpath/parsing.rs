//! Pure HTML parsing for the fast path.
//!
//! Parsing is kept free of I/O so the same functions drive both the live
//! executor and fixture-based tests. Selector structure tracks the upstream
//! markup: search listings expose `.prod_item .prod_name a`, product pages
//! expose the `#lowPriceCompanyArea` mall-price list with a representative
//! lowest-price block as fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::engine::result::MallOffer;
use crate::matching::weighted_match_score;
use crate::normalize::clean_display_text;
use crate::normalize::resources::{ACCESSORY_BRANDS, LISTING_ACCESSORY_KEYWORDS, MAIN_PRODUCT_HINTS};
use crate::utils::{extract_price_from_text, extract_product_id, normalize_href};

static PROD_NAME_LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".prod_item .prod_name a").expect("prod name link selector"));
static PCODE_LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="pcode="]"#).expect("pcode link selector"));
static RAW_PCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:pcode|prod_id)=(\d+)").expect("raw pcode regex"));

static PROD_TIT_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".prod_tit").expect("prod_tit selector"));
static MALL_ITEM_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#lowPriceCompanyArea .box__mall-price .list__mall-price .list-item")
        .expect("mall item selector")
});
static SELL_PRICE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".sell-price .text__num").expect("sell price selector"));
static ALT_PRICE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".price .num, .text__num").expect("alt price selector"));
static MALL_LOGO_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".box__logo img").expect("mall logo selector"));
static MALL_TEXT_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".box__logo .text, .mall-name").expect("mall text selector"));
static DELIVERY_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".box__delivery").expect("delivery selector"));
static OFFER_LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.link__full-cover").expect("offer link selector"));
static REP_PRICE_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".lowest_area .price_sect .num, .lowest_area .price_sect .price_num, .lowest_price .num")
        .expect("representative price selector")
});
static REP_MALL_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".lowest_area .mall_name, .lowest_price .mall_name").expect("rep mall selector")
});

const UNKNOWN_MALL: &str = "알 수 없음";

/// A scored product-id candidate from a search listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredProductId {
    pub product_id: String,
    pub score: f64,
}

/// Parsed product-detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProduct {
    pub product_name: String,
    pub lowest_price: u32,
    pub link: String,
    pub mall: Option<String>,
    pub free_shipping: Option<bool>,
    pub top_prices: Vec<MallOffer>,
}

fn element_text(element: &scraper::ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Extract and rank product-id candidates from a search listing.
///
/// Link text is scored against the *candidate used for this request*, never
/// the original query, so year-stripped candidates keep their advantage.
/// Listing titles carrying accessory keywords are skipped; ranking beyond
/// that is deliberately permissive (detail-page parsing is the real gate).
#[must_use]
pub fn parse_search_product_ids(
    html: &str,
    request_candidate: &str,
    max_candidates: usize,
) -> Vec<ScoredProductId> {
    let document = Html::parse_document(html);

    let mut links: Vec<(String, String)> = document
        .select(&PROD_NAME_LINK_SEL)
        .filter_map(|el| {
            el.value()
                .attr("href")
                .map(|href| (href.to_string(), element_text(&el)))
        })
        .collect();
    if links.is_empty() {
        links = document
            .select(&PCODE_LINK_SEL)
            .filter_map(|el| {
                el.value()
                    .attr("href")
                    .map(|href| (href.to_string(), element_text(&el)))
            })
            .collect();
    }

    // Raw-regex fallback only when the selector structure yielded nothing
    // at all; links that scored zero were rejected on purpose.
    if links.is_empty() {
        let mut scored = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for cap in RAW_PCODE_RE.captures_iter(html) {
            let product_id = cap[1].to_string();
            if seen.insert(product_id.clone()) {
                scored.push(ScoredProductId {
                    product_id,
                    score: 1.0,
                });
            }
            if scored.len() >= max_candidates {
                break;
            }
        }
        return scored;
    }

    let mut scored: Vec<ScoredProductId> = Vec::new();
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

    for (href, text) in links.iter().take(max_candidates * 3) {
        let Some(product_id) = extract_product_id(href) else {
            continue;
        };
        if seen.contains(&product_id) {
            continue;
        }
        let text_lower = text.to_lowercase();
        if LISTING_ACCESSORY_KEYWORDS.iter().any(|k| text_lower.contains(k)) {
            continue;
        }
        let score = weighted_match_score(request_candidate, text);
        if score > 0.0 {
            seen.insert(product_id.clone());
            scored.push(ScoredProductId { product_id, score });
        }
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(max_candidates);
    scored
}

fn parse_mall_offer(item: &scraper::ElementRef, rank: u32, product_base: &str) -> Option<MallOffer> {
    let price_text = item
        .select(&SELL_PRICE_SEL)
        .next()
        .or_else(|| item.select(&ALT_PRICE_SEL).next())
        .map(|el| element_text(&el))?;
    let price = extract_price_from_text(&price_text);
    if price == 0 {
        return None;
    }

    let mut mall = item
        .select(&MALL_LOGO_SEL)
        .next()
        .and_then(|img| img.value().attr("alt"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    if mall.is_none() {
        mall = item
            .select(&MALL_TEXT_SEL)
            .next()
            .map(|el| element_text(&el))
            .filter(|s| !s.is_empty());
    }

    let delivery = item
        .select(&DELIVERY_SEL)
        .next()
        .map(|el| clean_display_text(&element_text(&el)))
        .unwrap_or_default();
    let free_shipping = delivery.contains("무료");

    let link = item
        .select(&OFFER_LINK_SEL)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(|href| normalize_href(href, product_base))
        .unwrap_or_default();

    Some(MallOffer {
        rank,
        mall: mall.unwrap_or_else(|| UNKNOWN_MALL.to_string()),
        price,
        free_shipping,
        delivery,
        link,
    })
}

/// Parse the lowest-price block of a product-detail page.
///
/// Primary path reads the ordered mall-price list (top three offers); the
/// fallback reads the representative lowest-price area that replaces the
/// list on some layouts.
#[must_use]
pub fn parse_product_lowest_price(
    html: &str,
    fallback_name: &str,
    product_url: &str,
    product_base: &str,
) -> Option<ParsedProduct> {
    let document = Html::parse_document(html);

    let raw_title = document
        .select(&PROD_TIT_SEL)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback_name.to_string());
    let product_name = clean_display_text(&raw_title);

    let items: Vec<_> = document.select(&MALL_ITEM_SEL).collect();
    if items.is_empty() {
        // Representative lowest-price fallback.
        let price_text = document.select(&REP_PRICE_SEL).next().map(|el| element_text(&el))?;
        let price = extract_price_from_text(&price_text);
        if price == 0 {
            return None;
        }
        let mall = document
            .select(&REP_MALL_SEL)
            .next()
            .map(|el| element_text(&el))
            .filter(|s| !s.is_empty());
        return Some(ParsedProduct {
            product_name,
            lowest_price: price,
            link: product_url.to_string(),
            mall,
            free_shipping: None,
            top_prices: Vec::new(),
        });
    }

    let mut top_prices = Vec::new();
    for (idx, item) in items.iter().take(3).enumerate() {
        if let Some(offer) = parse_mall_offer(item, idx as u32 + 1, product_base) {
            top_prices.push(offer);
        }
    }
    let lowest = top_prices.first()?.clone();

    Some(ParsedProduct {
        product_name,
        lowest_price: lowest.price,
        link: if lowest.link.is_empty() {
            product_url.to_string()
        } else {
            lowest.link.clone()
        },
        mall: Some(lowest.mall),
        free_shipping: Some(lowest.free_shipping),
        top_prices,
    })
}

/// Whether a detail-page title reads as an accessory-maker product while
/// sharing no main-product hint with the query.
#[must_use]
pub fn is_accessory_brand_product(product_name: &str, query: &str) -> bool {
    let name_lower = product_name.to_lowercase();
    if !ACCESSORY_BRANDS.iter().any(|b| name_lower.contains(b)) {
        return false;
    }
    let query_lower = query.to_lowercase();
    !MAIN_PRODUCT_HINTS
        .iter()
        .any(|hint| name_lower.contains(hint) && query_lower.contains(hint))
}
