//! GSM 03.38 message segmentation.
//!
//! Text that fits the GSM 7-bit default alphabet (plus extension table) is counted in septets,
//! anything else in UCS-2 (UTF-16) units. A single message holds 160 septets or 70 units; once
//! split, each part loses room to the concatenation header and holds 153 septets or 67 units.

const GSM_SINGLE_SEPTETS: usize = 160;
const GSM_PART_SEPTETS: usize = 153;
const UCS2_SINGLE_UNITS: usize = 70;
const UCS2_PART_UNITS: usize = 67;

const GSM_BASIC: &str = "@£$¥èéùìòÇ\nØø\rÅåΔ_ΦΓΛΩΠΨΣΘΞÆæßÉ !\"#¤%&'()*+,-./0123456789:;<=>?\
¡ABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§¿abcdefghijklmnopqrstuvwxyzäöñüà";

/// Extension table characters; each costs an escape septet plus itself.
const GSM_EXTENSION: &str = "\u{0c}^{}\\[~]|€";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Gsm7,
    Ucs2,
}

impl Encoding {
    /// GSM 7-bit when every character is in the default alphabet or its extension table.
    pub fn detect(text: &str) -> Self {
        if text.chars().all(|c| gsm_cost(c).is_some()) {
            Encoding::Gsm7
        } else {
            Encoding::Ucs2
        }
    }

    fn cost(self, c: char) -> usize {
        match self {
            Encoding::Gsm7 => gsm_cost(c).unwrap_or(1),
            Encoding::Ucs2 => c.len_utf16(),
        }
    }

    fn single_limit(self) -> usize {
        match self {
            Encoding::Gsm7 => GSM_SINGLE_SEPTETS,
            Encoding::Ucs2 => UCS2_SINGLE_UNITS,
        }
    }

    fn part_limit(self) -> usize {
        match self {
            Encoding::Gsm7 => GSM_PART_SEPTETS,
            Encoding::Ucs2 => UCS2_PART_UNITS,
        }
    }
}

fn gsm_cost(c: char) -> Option<usize> {
    if GSM_BASIC.contains(c) {
        Some(1)
    } else if GSM_EXTENSION.contains(c) {
        Some(2)
    } else {
        None
    }
}

/// Split `text` into ordered parts. Text that fits one message comes back as a single part
/// (an empty text included); concatenating the parts always yields `text`.
pub fn divide_message(text: &str) -> Vec<String> {
    let encoding = Encoding::detect(text);
    let total: usize = text.chars().map(|c| encoding.cost(c)).sum();
    if total <= encoding.single_limit() {
        return vec![text.to_string()];
    }

    let limit = encoding.part_limit();
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut used = 0;
    for c in text.chars() {
        let cost = encoding.cost(c);
        if used + cost > limit {
            parts.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(c);
        used += cost;
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
