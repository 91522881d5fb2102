//! Modeled competitor metrics
//!
//! None of these numbers come from a real SEO data provider. [`Estimator`] is
//! the seam where such a provider would plug in; [`ModeledEstimator`] fills
//! it with plausible values drawn from fixed ranges. Draws are seeded by the
//! target name and a configurable seed, so the same run configuration always
//! produces the same report.

use crate::{Probe, ProbeError, ProbeResult, Target};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use xxhash_rust::xxh64::xxh64;

#[async_trait]
pub trait Estimator: Send + Sync {
    async fn competitor_profile(&self, target: &Target) -> Result<CompetitorProfile, ProbeError>;

    async fn keyword_opportunities(&self) -> Result<KeywordOpportunities, ProbeError>;

    async fn link_profile(&self, targets: &[Target]) -> Result<LinkProfile, ProbeError>;

    async fn social_signals(&self, target: &Target) -> Result<SocialSignals, ProbeError>;
}

/// Share counts attributed to a target's home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialSignals {
    pub facebook_shares: u32,
    pub twitter_shares: u32,
    pub linkedin_shares: u32,
    /// 0-100
    pub social_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorProfile {
    pub estimated_traffic: u64,
    pub domain_authority: u32,
    pub backlinks: u64,
    pub organic_keywords: u64,
    pub top_keywords: Vec<KeywordRanking>,
    pub content_gaps: Vec<String>,
    pub technical_advantages: Vec<String>,
    pub marketing_strategies: MarketingStrategies,
    pub user_experience: UserExperience,
    pub competitive_position: CompetitivePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRanking {
    pub keyword: String,
    pub position: u32,
    pub volume: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketingStrategies {
    pub content_marketing: bool,
    pub social_media: bool,
    pub paid_advertising: bool,
    pub email_marketing: bool,
    pub affiliate_program: bool,
}

/// Rubric scores out of 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserExperience {
    pub navigation_clarity: u32,
    pub content_quality: u32,
    pub visual_design: u32,
    pub mobile_experience: u32,
    pub overall_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "Tier 1")]
    Tier1,
    #[serde(rename = "Tier 2")]
    Tier2,
    #[serde(rename = "Tier 3")]
    Tier3,
}

impl Tier {
    pub fn for_score(score: f64) -> Self {
        if score > 80.0 {
            Tier::Tier1
        } else if score > 70.0 {
            Tier::Tier2
        } else {
            Tier::Tier3
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Tier1 => "Tier 1",
            Tier::Tier2 => "Tier 2",
            Tier::Tier3 => "Tier 3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitivePosition {
    pub domain_authority: u32,
    /// Estimated number of indexed content pages
    pub content_volume: u32,
    #[serde(rename = "technicalSEO")]
    pub technical_seo: u32,
    pub user_engagement: u32,
    pub overall_score: u32,
    pub tier: Tier,
}

impl CompetitivePosition {
    /// Content volume saturates at 1500 pages when mapped onto the 0-100 scale.
    const CONTENT_PAGES_PER_POINT: f64 = 15.0;

    /// Weighted composite of the four sub-scores, each on a 0-100 scale.
    pub fn from_scores(
        domain_authority: u32,
        content_volume: u32,
        technical_seo: u32,
        user_engagement: u32,
    ) -> Self {
        let content = (content_volume as f64 / Self::CONTENT_PAGES_PER_POINT).min(100.0);
        let composite = domain_authority as f64 * 0.30
            + content * 0.20
            + technical_seo as f64 * 0.25
            + user_engagement as f64 * 0.25;

        Self {
            domain_authority,
            content_volume,
            technical_seo,
            user_engagement,
            overall_score: composite.round() as u32,
            tier: Tier::for_score(composite),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordOpportunities {
    #[serde(rename = "highVolumeLowCompetition")]
    pub high_volume_low_competition: Vec<RatedKeyword>,
    pub long_tail_opportunities: Vec<ScoredKeyword>,
    #[serde(rename = "localSEOKeywords")]
    pub local_seo_keywords: Vec<ScoredKeyword>,
    pub competitor_keyword_gaps: Vec<String>,
    pub trending_keywords: Vec<TrendingKeyword>,
    pub seasonal_opportunities: Vec<SeasonalKeywords>,
    pub voice_search_keywords: Vec<String>,
    pub question_based_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedKeyword {
    pub keyword: String,
    pub volume: u32,
    pub difficulty: u32,
    pub opportunity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredKeyword {
    pub keyword: String,
    pub volume: u32,
    pub difficulty: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingKeyword {
    pub keyword: String,
    pub trend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalKeywords {
    pub season: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkProfile {
    pub estimated_backlinks: BTreeMap<Target, u64>,
    pub link_opportunities: Vec<LinkOpportunity>,
    pub anchor_text_analysis: AnchorTextMix,
    pub referring_domains: ReferringDomains,
    pub link_velocity: LinkVelocity,
    pub toxic_links: ToxicLinks,
    pub link_gaps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkOpportunity {
    pub domain: String,
    pub authority: u32,
    pub relevance: String,
}

/// Share of anchors per type, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorTextMix {
    pub branded: u32,
    pub exact: u32,
    pub partial: u32,
    pub generic: u32,
    pub naked: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferringDomains {
    pub total: u32,
    pub unique: u32,
    pub authoritative: u32,
    pub relevant: u32,
    pub toxic: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkVelocity {
    pub monthly: u32,
    pub trend: String,
    pub natural_pattern: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToxicLinks {
    pub count: u32,
    pub percentage: f64,
    pub risk_level: String,
}

const CONTENT_GAPS: [&str; 6] = [
    "Regional casino guides",
    "Advanced game strategies",
    "Mobile casino optimization",
    "Cryptocurrency gambling",
    "Live dealer experiences",
    "VIP program analysis",
];

const TECHNICAL_ADVANTAGES: [&str; 5] = [
    "Fast loading times",
    "Mobile optimization",
    "Schema markup",
    "Security headers",
    "Clean URL structure",
];

/// Backlink counts used instead of a modeled value for well-known competitors.
const KNOWN_BACKLINKS: [(&str, u64); 10] = [
    ("casino.ca", 45_000),
    ("askgamblers.com", 120_000),
    ("casino.guru", 85_000),
    ("casinomeister.com", 35_000),
    ("casinolistings.com", 28_000),
    ("onlinecasinos.com", 55_000),
    ("gamblingsites.com", 32_000),
    ("casino.org", 67_000),
    ("vegasslotsonline.com", 42_000),
    ("casinoguide.ca", 15_000),
];

/// Separates the backlink draw from the competitor-profile draw of the same target.
const LINK_STREAM: u64 = 0x6c69_6e6b;
const SOCIAL_STREAM: u64 = 0x736f_6369;

/// Deterministic estimator drawing every metric from a documented range.
#[derive(Debug, Clone, Default)]
pub struct ModeledEstimator {
    seed: u64,
}

impl ModeledEstimator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, target: &Target, stream: u64) -> StdRng {
        StdRng::seed_from_u64(xxh64(target.as_str().as_bytes(), self.seed ^ stream))
    }

    pub fn profile(&self, target: &Target) -> CompetitorProfile {
        let mut rng = self.rng_for(target, 0);

        let estimated_traffic = rng.gen_range(100_000..1_100_000);
        let domain_authority = rng.gen_range(60..100);
        let backlinks = rng.gen_range(10_000..60_000);
        let organic_keywords = rng.gen_range(5_000..20_000);

        let top_keywords = top_keyword_phrases(target.as_str())
            .into_iter()
            .map(|keyword| KeywordRanking {
                keyword,
                position: rng.gen_range(1..=10),
                volume: rng.gen_range(1_000..11_000),
            })
            .collect();

        let gap_count = rng.gen_range(2..=4);
        let advantage_count = rng.gen_range(1..=3);

        let marketing_strategies = MarketingStrategies {
            content_marketing: rng.gen::<f64>() > 0.5,
            social_media: rng.gen::<f64>() > 0.3,
            paid_advertising: rng.gen::<f64>() > 0.6,
            email_marketing: rng.gen::<f64>() > 0.4,
            affiliate_program: rng.gen::<f64>() > 0.7,
        };

        let user_experience = UserExperience {
            navigation_clarity: rng.gen_range(6..=10),
            content_quality: rng.gen_range(7..=9),
            visual_design: rng.gen_range(6..=9),
            mobile_experience: rng.gen_range(7..=9),
            overall_score: rng.gen_range(8..=9),
        };

        let competitive_position = CompetitivePosition::from_scores(
            rng.gen_range(60..=89),
            rng.gen_range(500..=1_499),
            rng.gen_range(75..=94),
            rng.gen_range(70..=94),
        );

        CompetitorProfile {
            estimated_traffic,
            domain_authority,
            backlinks,
            organic_keywords,
            top_keywords,
            content_gaps: CONTENT_GAPS[..gap_count].iter().map(|s| s.to_string()).collect(),
            technical_advantages: TECHNICAL_ADVANTAGES[..advantage_count]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            marketing_strategies,
            user_experience,
            competitive_position,
        }
    }

    pub fn backlinks(&self, target: &Target) -> u64 {
        KNOWN_BACKLINKS
            .iter()
            .find(|(domain, _)| *domain == target.as_str())
            .map(|(_, count)| *count)
            .unwrap_or_else(|| self.rng_for(target, LINK_STREAM).gen_range(10_000..60_000))
    }

    pub fn social(&self, target: &Target) -> SocialSignals {
        let mut rng = self.rng_for(target, SOCIAL_STREAM);
        SocialSignals {
            facebook_shares: rng.gen_range(0..1_000),
            twitter_shares: rng.gen_range(0..500),
            linkedin_shares: rng.gen_range(0..200),
            social_score: rng.gen_range(0..100),
        }
    }

    pub fn link_profile_for(&self, targets: &[Target]) -> LinkProfile {
        LinkProfile {
            estimated_backlinks: targets
                .iter()
                .map(|t| (t.clone(), self.backlinks(t)))
                .collect(),
            ..link_profile_baseline()
        }
    }
}

fn top_keyword_phrases(domain: &str) -> Vec<String> {
    let brand = domain.replacen(".com", "", 1).replacen(".ca", "", 1);
    let market = if domain.ends_with(".ca") {
        "canada"
    } else {
        "international"
    };
    vec![
        format!("{brand} review"),
        "best casino bonuses".to_string(),
        "online casino games".to_string(),
        format!("casino {market}"),
        format!("gambling {}", domain.replacen('.', " ", 1)),
    ]
}

#[async_trait]
impl Estimator for ModeledEstimator {
    async fn competitor_profile(&self, target: &Target) -> Result<CompetitorProfile, ProbeError> {
        Ok(self.profile(target))
    }

    async fn keyword_opportunities(&self) -> Result<KeywordOpportunities, ProbeError> {
        Ok(keyword_opportunities())
    }

    async fn link_profile(&self, targets: &[Target]) -> Result<LinkProfile, ProbeError> {
        Ok(self.link_profile_for(targets))
    }

    async fn social_signals(&self, target: &Target) -> Result<SocialSignals, ProbeError> {
        Ok(self.social(target))
    }
}

fn rated(keyword: &str, volume: u32, difficulty: u32, opportunity: &str) -> RatedKeyword {
    RatedKeyword {
        keyword: keyword.to_string(),
        volume,
        difficulty,
        opportunity: opportunity.to_string(),
    }
}

fn scored(keyword: &str, volume: u32, difficulty: u32) -> ScoredKeyword {
    ScoredKeyword {
        keyword: keyword.to_string(),
        volume,
        difficulty,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn keyword_opportunities() -> KeywordOpportunities {
    KeywordOpportunities {
        high_volume_low_competition: vec![
            rated("online casino canada 2025", 45_000, 65, "high"),
            rated("best casino bonuses canada", 32_000, 58, "high"),
            rated("mobile casino real money", 28_000, 62, "medium"),
            rated("live dealer casino canada", 22_000, 55, "high"),
            rated("progressive jackpot slots", 18_000, 48, "high"),
        ],
        long_tail_opportunities: vec![
            scored("best online casino canada 2025 reviews", 5_400, 35),
            scored("mobile casino real money no deposit bonus", 3_200, 42),
            scored("live dealer blackjack canada legal", 2_800, 38),
            scored("progressive jackpot slots highest payout", 4_100, 45),
            scored("crypto casino bitcoin deposits canada", 2_600, 33),
        ],
        local_seo_keywords: vec![
            scored("online casino ontario legal", 8_500, 55),
            scored("casino alberta gambling sites", 3_200, 48),
            scored("british columbia casino online", 2_800, 52),
            scored("quebec casino en ligne", 4_200, 45),
            scored("toronto casino online gaming", 1_800, 38),
        ],
        competitor_keyword_gaps: strings(&[
            "Advanced slot strategies",
            "Regional casino regulations",
            "Mobile casino tutorials",
            "Live casino etiquette",
            "Cryptocurrency gambling guides",
        ]),
        trending_keywords: [
            ("metaverse casino", "+150%"),
            ("NFT gambling", "+89%"),
            ("AI casino games", "+67%"),
            ("VR casino experience", "+45%"),
            ("social casino gaming", "+34%"),
        ]
        .iter()
        .map(|(keyword, trend)| TrendingKeyword {
            keyword: keyword.to_string(),
            trend: trend.to_string(),
        })
        .collect(),
        seasonal_opportunities: vec![
            SeasonalKeywords {
                season: "Holiday Season".to_string(),
                keywords: strings(&["christmas casino bonuses", "new year casino promotions"]),
            },
            SeasonalKeywords {
                season: "Summer".to_string(),
                keywords: strings(&["vacation casino gaming", "summer slot tournaments"]),
            },
            SeasonalKeywords {
                season: "Tax Season".to_string(),
                keywords: strings(&["casino winnings taxes", "gambling tax canada"]),
            },
        ],
        voice_search_keywords: strings(&[
            "what is the best online casino in canada",
            "how to play online slots for real money",
            "where can i play live dealer games",
            "which casino has the biggest bonuses",
            "how to withdraw money from online casino",
        ]),
        question_based_keywords: strings(&[
            "how to choose the best online casino",
            "what are the safest casino payment methods",
            "why do casino bonuses have wagering requirements",
            "when can i withdraw my casino winnings",
            "where to find the highest RTP slots",
        ]),
    }
}

fn link_profile_baseline() -> LinkProfile {
    LinkProfile {
        estimated_backlinks: BTreeMap::new(),
        link_opportunities: [
            ("gambling-industry-news.com", 75, "high"),
            ("casino-affiliate-network.com", 68, "high"),
            ("gaming-blog-directory.com", 62, "medium"),
            ("responsible-gambling.org", 80, "medium"),
            ("casino-software-reviews.com", 58, "high"),
        ]
        .iter()
        .map(|(domain, authority, relevance)| LinkOpportunity {
            domain: domain.to_string(),
            authority: *authority,
            relevance: relevance.to_string(),
        })
        .collect(),
        anchor_text_analysis: AnchorTextMix {
            branded: 35,
            exact: 15,
            partial: 25,
            generic: 20,
            naked: 5,
        },
        referring_domains: ReferringDomains {
            total: 2_500,
            unique: 1_800,
            authoritative: 450,
            relevant: 1_200,
            toxic: 50,
        },
        link_velocity: LinkVelocity {
            monthly: 150,
            trend: "increasing".to_string(),
            natural_pattern: true,
        },
        toxic_links: ToxicLinks {
            count: 25,
            percentage: 1.2,
            risk_level: "low".to_string(),
        },
        link_gaps: strings(&[
            "Industry association websites",
            "Government gambling regulatory sites",
            "Casino software provider sites",
            "Gambling news publications",
            "Responsible gambling organizations",
        ]),
    }
}

/// Per-target competitor estimates as a probe.
pub struct CompetitorProbe {
    estimator: Arc<dyn Estimator>,
}

impl CompetitorProbe {
    pub fn new(estimator: Arc<dyn Estimator>) -> Self {
        Self { estimator }
    }
}

#[async_trait]
impl Probe for CompetitorProbe {
    type Output = CompetitorProfile;

    async fn analyze(&self, target: &Target) -> ProbeResult<CompetitorProfile> {
        self.estimator.competitor_profile(target).await.into()
    }
}
