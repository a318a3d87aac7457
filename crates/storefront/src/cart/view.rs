//! Display derivation for the cart panel.
//!
//! Everything here is a pure function of the cart snapshot: line ordering,
//! canonical product URLs and formatted prices.

use std::cmp::Ordering;

use storefront_cart_core::{Cart, CartLine, CurrencyCode, Merchandise};

/// Canonical product URL for a variant.
///
/// `/product/{handle}` followed by the variant's options as a query string.
/// Options carrying the "Default Title" sentinel are skipped, names are
/// lower-cased, and a name seen twice keeps its first position with the
/// last value.
#[must_use]
pub fn merchandise_url(merchandise: &Merchandise) -> String {
    let mut params: Vec<(String, &str)> = Vec::new();
    for option in merchandise.distinguishing_options() {
        let name = option.name.to_lowercase();
        match params.iter_mut().find(|(existing, _)| *existing == name) {
            Some(param) => param.1 = &option.value,
            None => params.push((name, &option.value)),
        }
    }

    let path = format!("/product/{}", merchandise.product.handle);
    if params.is_empty() {
        return path;
    }

    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{path}?{query}")
}

/// Fold Latin letters with diacritics to their base letter.
///
/// Covers Latin-1 and the common Latin Extended-A letters; ligatures fold to
/// their first letter (`Œ` to `O`, `ß` to `s`). Anything else, including
/// non-Latin scripts, compares by code point.
const fn fold_diacritic(c: char) -> char {
    match c {
        'à'..='æ' | 'ā' | 'ă' | 'ą' => 'a',
        'À'..='Æ' | 'Ā' | 'Ă' | 'Ą' => 'A',
        'ç' | 'ć' | 'č' => 'c',
        'Ç' | 'Ć' | 'Č' => 'C',
        'ď' | 'đ' => 'd',
        'Ď' | 'Đ' => 'D',
        'è'..='ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'È'..='Ë' | 'Ē' | 'Ė' | 'Ę' | 'Ě' => 'E',
        'ğ' => 'g',
        'Ğ' => 'G',
        'ì'..='ï' | 'ī' | 'į' | 'ı' => 'i',
        'Ì'..='Ï' | 'Ī' | 'Į' | 'İ' => 'I',
        'ł' | 'ľ' => 'l',
        'Ł' | 'Ľ' => 'L',
        'ñ' | 'ń' | 'ň' => 'n',
        'Ñ' | 'Ń' | 'Ň' => 'N',
        'ò'..='ö' | 'ø' | 'ō' | 'ő' | 'œ' => 'o',
        'Ò'..='Ö' | 'Ø' | 'Ō' | 'Ő' | 'Œ' => 'O',
        'ř' => 'r',
        'Ř' => 'R',
        'ß' | 'ś' | 'ş' | 'š' => 's',
        'Ś' | 'Ş' | 'Š' => 'S',
        'ť' => 't',
        'Ť' => 'T',
        'ù'..='ü' | 'ū' | 'ů' | 'ű' | 'ų' => 'u',
        'Ù'..='Ü' | 'Ū' | 'Ů' | 'Ű' | 'Ų' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' | 'Ÿ' => 'Y',
        'ź' | 'ż' | 'ž' => 'z',
        'Ź' | 'Ż' | 'Ž' => 'Z',
        _ => c,
    }
}

fn primary_key(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().map(fold_diacritic).flat_map(char::to_lowercase)
}

/// Compare two titles the way a shopper expects to read them.
///
/// Letters compare ignoring case and accents first. Titles that differ only
/// in case put the lower-case form first; remaining ties fall back to the
/// raw characters.
#[must_use]
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(primary_key(b))
        .then_with(|| {
            let folded = |s: &str| s.chars().map(fold_diacritic).collect::<Vec<_>>();
            let (a_folded, b_folded) = (folded(a), folded(b));
            a_folded
                .iter()
                .zip(&b_folded)
                .find(|(x, y)| x != y)
                .map_or(Ordering::Equal, |(x, y)| {
                    match (x.is_lowercase(), y.is_lowercase()) {
                        (true, false) => Ordering::Less,
                        (false, true) => Ordering::Greater,
                        _ => x.cmp(y),
                    }
                })
        })
        .then_with(|| a.cmp(b))
}

/// Lines in display order: by product title, stable for equal titles.
///
/// The cart's own line order is untouched.
#[must_use]
pub fn sorted_lines(cart: &Cart) -> Vec<&CartLine> {
    let mut lines: Vec<&CartLine> = cart.lines.iter().collect();
    lines.sort_by(|a, b| locale_cmp(&a.merchandise.product.title, &b.merchandise.product.title));
    lines
}

// =============================================================================
// View Models
// =============================================================================

/// One cart line ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineView {
    pub id: String,
    pub merchandise_id: String,
    pub title: String,
    pub variant_title: Option<String>,
    pub url: String,
    pub image_url: Option<String>,
    pub image_alt: String,
    pub quantity: u32,
    pub line_price: String,
    /// The line exists only locally and has no backend id yet.
    pub pending: bool,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        let merchandise = &line.merchandise;
        let product = &merchandise.product;
        let image = product.featured_image.as_ref();
        Self {
            id: line.id.to_string(),
            merchandise_id: merchandise.id.to_string(),
            title: product.title.clone(),
            variant_title: merchandise.variant_title().map(String::from),
            url: merchandise_url(merchandise),
            image_url: image.map(|img| img.url.clone()),
            image_alt: image
                .and_then(|img| img.alt_text.clone())
                .unwrap_or_else(|| product.title.clone()),
            quantity: line.quantity,
            line_price: line.cost.total_amount.display_with_code(),
            pending: line.id.is_optimistic(),
        }
    }
}

/// The cart panel ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartPanelView {
    pub lines: Vec<CartLineView>,
    pub taxes: String,
    pub total: String,
    pub item_count: u32,
    pub is_empty: bool,
}

impl CartPanelView {
    /// The panel with no cart at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::from(&Cart::empty(None, CurrencyCode::default()))
    }

    /// Build the panel for an optional snapshot.
    #[must_use]
    pub fn from_snapshot(cart: Option<&Cart>) -> Self {
        cart.map_or_else(Self::empty, Self::from)
    }
}

impl From<&Cart> for CartPanelView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: sorted_lines(cart)
                .into_iter()
                .map(CartLineView::from)
                .collect(),
            taxes: cart.cost.total_tax.display_with_code(),
            total: cart.cost.total.display_with_code(),
            item_count: cart.total_quantity,
            is_empty: cart.is_empty(),
        }
    }
}
