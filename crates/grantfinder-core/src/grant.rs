//! Grant records as stored in the catalog document and the remote table.
//!
//! Wire keys are the Traditional Chinese field names used by the published
//! `grants-database.json`; the Rust side uses English field names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A label that does not belong to one of the closed classification sets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed classification enum whose wire form is its display label.
///
/// Each variant also gets an ASCII slug so it can be typed on a command line.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal, $slug:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Display label, identical to the wire form.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// ASCII alias accepted by [`FromStr`].
            pub fn slug(self) -> &'static str {
                match self {
                    $($name::$variant => $slug,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label() == s || v.slug().eq_ignore_ascii_case(s))
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

closed_enum! {
    /// Top-level grouping of grant programs.
    pub enum PrimaryCategory ("primary category") {
        DigitalTransformation => "數位轉型", "digital-transformation";
        InnovationRnd => "創新研發", "innovation-rnd";
        TalentTraining => "人才培訓", "talent-training";
    }
}

closed_enum! {
    /// Coarse funding-amount class, assigned when the record is authored.
    pub enum AmountBucket ("amount bucket") {
        /// Under 1,000,000.
        Small => "小額補助", "small";
        /// 1,000,000 to 5,000,000.
        Medium => "中額補助", "medium";
        /// 5,000,000 to 10,000,000.
        Large => "大額補助", "large";
        /// Over 10,000,000.
        ExtraLarge => "超大額補助", "extra-large";
        Unlimited => "無上限補助", "unlimited";
    }
}

closed_enum! {
    /// Coarse class of the issuing body.
    pub enum OrganizerCategory ("organizer category") {
        EconomicAffairs => "經濟部", "economic-affairs";
        DigitalAffairs => "數位發展部", "digital-affairs";
        Labor => "勞動部", "labor";
        LocalGovernment => "地方政府", "local-government";
    }
}

impl AmountBucket {
    /// Human-readable range, as shown next to the bucket in the admin form.
    pub fn range_hint(self) -> &'static str {
        match self {
            AmountBucket::Small => "100萬以下",
            AmountBucket::Medium => "100-500萬",
            AmountBucket::Large => "500-1000萬",
            AmountBucket::ExtraLarge => "1000萬以上",
            AmountBucket::Unlimited => "無上限",
        }
    }
}

/// External link attached to a grant.
///
/// Older catalog files stored references as bare strings; those deserialize
/// with the string used as both label and URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ReferenceRepr")]
pub struct Reference {
    #[serde(rename = "text")]
    pub label: String,
    pub url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReferenceRepr {
    Link { text: String, url: String },
    Bare(String),
}

impl From<ReferenceRepr> for Reference {
    fn from(repr: ReferenceRepr) -> Self {
        match repr {
            ReferenceRepr::Link { text, url } => Reference { label: text, url },
            ReferenceRepr::Bare(s) => Reference {
                label: s.clone(),
                url: s,
            },
        }
    }
}

/// One government grant program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantRecord {
    pub id: String,
    #[serde(rename = "計畫名稱")]
    pub name: String,
    #[serde(rename = "補助類別")]
    pub primary_category: PrimaryCategory,
    #[serde(rename = "子分類", default)]
    pub sub_category: String,
    #[serde(rename = "補助重點", default)]
    pub summary: String,
    #[serde(rename = "補助對象", default, deserialize_with = "null_as_empty")]
    pub eligible_applicants: Vec<String>,
    /// Free text such as "最高1000萬元"; see [`crate::sort::amount_key`].
    #[serde(rename = "補助金額", default)]
    pub amount_display: String,
    #[serde(rename = "補助比例上限", default)]
    pub subsidy_ratio_cap: String,
    /// Free-text schedule. Compared as a plain string by the deadline sort.
    #[serde(rename = "計畫時程", default)]
    pub timeline: String,
    #[serde(rename = "主辦單位", default)]
    pub organizer: String,
    #[serde(rename = "參考資料", default, deserialize_with = "null_as_empty")]
    pub references: Vec<Reference>,
    #[serde(rename = "企業規模", default, deserialize_with = "null_as_empty")]
    pub company_sizes: Vec<String>,
    #[serde(rename = "金額分類")]
    pub amount_bucket: AmountBucket,
    #[serde(rename = "主辦機關分類")]
    pub organizer_category: OrganizerCategory,
}

impl GrantRecord {
    /// An empty record carrying the admin form defaults.
    pub fn draft(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            primary_category: PrimaryCategory::DigitalTransformation,
            sub_category: String::new(),
            summary: String::new(),
            eligible_applicants: Vec::new(),
            amount_display: String::new(),
            subsidy_ratio_cap: String::new(),
            timeline: String::new(),
            organizer: String::new(),
            references: Vec::new(),
            company_sizes: Vec::new(),
            amount_bucket: AmountBucket::Medium,
            organizer_category: OrganizerCategory::EconomicAffairs,
        }
    }

    /// Text searched by the free-text filter: name, summary and organizer.
    pub fn search_text(&self) -> String {
        format!("{} {} {}", self.name, self.summary, self.organizer)
    }
}

/// Id for a newly authored record, e.g. `grant-1760000000000`.
pub fn generate_id(unix_millis: i64) -> String {
    format!("grant-{unix_millis}")
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
