// ==========================================
// 销售线索 CRM - 映射规则表
// ==========================================
// 职责: 表头识别与单元格分类的有序规则表（模式 → 结果）
// 红线: 规则按表中顺序匹配，首个命中即返回；扩展规则只改表，不改流程
// ==========================================

use crate::domain::mapping::StandardField;
use crate::domain::types::{ChannelStatus, Section, TargetEntity};

// ==========================================
// Keyword - 关键字匹配方式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Sub(&'static str),  // 子串匹配
    Word(&'static str), // 整词匹配（按非字母数字切分）
}

impl Keyword {
    pub fn matches(&self, haystack: &str) -> bool {
        match self {
            Keyword::Sub(needle) => haystack.contains(needle),
            Keyword::Word(word) => haystack
                .split(|c: char| !c.is_alphanumeric())
                .any(|token| token == *word),
        }
    }
}

fn any_keyword(keywords: &[Keyword], haystack: &str) -> bool {
    keywords.iter().any(|k| k.matches(haystack))
}

// ==========================================
// 标准字段同义词表（优先级顺序）
// ==========================================
// name → 联系方式 → 公司名 → 联系渠道 → 渠道状态 → 阶段 → 备注
#[derive(Debug)]
pub struct SynonymRule {
    pub field: StandardField,
    pub exact: &'static [&'static str],
    pub contains: &'static [&'static str],
}

pub const STANDARD_FIELD_RULES: &[SynonymRule] = &[
    SynonymRule {
        field: StandardField::Name,
        exact: &[
            "name", "full name", "contact name", "lead name", "contact", "person",
            "first name", "firstname", "given name",
        ],
        contains: &["full name", "contact name", "lead name", "person name", "first name"],
    },
    SynonymRule {
        field: StandardField::LastName,
        exact: &["last name", "lastname", "surname", "family name"],
        contains: &["last name", "surname", "family name"],
    },
    SynonymRule {
        field: StandardField::Email,
        exact: &["email", "e-mail", "email address", "e-mail address", "mail"],
        contains: &["email address", "e-mail address", "work email"],
    },
    SynonymRule {
        field: StandardField::Phone,
        exact: &["phone", "mobile", "telephone", "tel", "phone number", "cell"],
        contains: &["phone", "mobile", "telephone"],
    },
    SynonymRule {
        field: StandardField::Title,
        exact: &["title", "job title", "position", "role", "job role"],
        contains: &["job title", "job position"],
    },
    SynonymRule {
        field: StandardField::CompanyName,
        exact: &["company", "company name", "organization", "organisation", "account", "employer", "account name"],
        contains: &["company name", "organization name", "organisation name", "employer", "account name"],
    },
    SynonymRule {
        field: StandardField::LinkedinUrl,
        exact: &["linkedin", "linkedin url", "linkedin profile", "profile url"],
        contains: &["linkedin url", "linkedin profile", "linkedin.com", "linkedin link"],
    },
    SynonymRule {
        field: StandardField::Website,
        exact: &["website", "web site", "url", "domain", "company website"],
        contains: &["website", "company url", "web site"],
    },
    SynonymRule {
        field: StandardField::LinkedinStatus,
        exact: &[],
        contains: &["linkedin status", "linkedin outreach", "connection status", "linkedin stage"],
    },
    SynonymRule {
        field: StandardField::EmailStatus,
        exact: &[],
        contains: &["email status", "email outreach", "e-mail status", "mail status"],
    },
    SynonymRule {
        field: StandardField::Stage,
        exact: &["stage", "status", "pipeline stage", "lead status", "deal stage"],
        contains: &["pipeline stage", "deal stage", "lead stage"],
    },
    SynonymRule {
        field: StandardField::Notes,
        exact: &["notes", "note", "comments", "comment", "remarks"],
        contains: &["notes"],
    },
];

/// 表头归一化: trim + 小写，下划线视作空格，连续空白合并
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 标准字段匹配：整表先做精确匹配，再做子串匹配，首个命中优先
pub fn match_standard_field(normalized: &str) -> Option<StandardField> {
    STANDARD_FIELD_RULES
        .iter()
        .find(|rule| rule.exact.contains(&normalized))
        .or_else(|| {
            STANDARD_FIELD_RULES
                .iter()
                .find(|rule| rule.contains.iter().any(|s| normalized.contains(s)))
        })
        .map(|rule| rule.field)
}

// ==========================================
// 分区关键字表
// ==========================================
#[derive(Debug)]
pub struct SectionRule {
    pub keywords: &'static [Keyword],
    pub section: Section,
}

pub const SECTION_RULES: &[SectionRule] = &[
    SectionRule {
        keywords: &[
            Keyword::Sub("linkedin"),
            Keyword::Sub("linked in"),
            Keyword::Sub("inmail"),
            Keyword::Sub("connection"),
            Keyword::Word("li"),
        ],
        section: Section::Linkedin,
    },
    SectionRule {
        keywords: &[
            Keyword::Word("email"),
            Keyword::Sub("e-mail"),
            Keyword::Word("inbox"),
            Keyword::Sub("bounce"),
            Keyword::Sub("open rate"),
            Keyword::Sub("newsletter"),
        ],
        section: Section::Email,
    },
];

pub fn classify_section(normalized: &str) -> Section {
    SECTION_RULES
        .iter()
        .find(|rule| any_keyword(rule.keywords, normalized))
        .map(|rule| rule.section)
        .unwrap_or(Section::General)
}

// ==========================================
// 目标实体关键字表（组织/财务/地理词汇 → 公司）
// ==========================================
pub const SECONDARY_ENTITY_KEYWORDS: &[Keyword] = &[
    // 组织
    Keyword::Sub("company"),
    Keyword::Sub("organization"),
    Keyword::Sub("organisation"),
    Keyword::Sub("industry"),
    Keyword::Sub("sector"),
    Keyword::Sub("employee"),
    Keyword::Sub("headcount"),
    Keyword::Sub("team size"),
    Keyword::Sub("founded"),
    // 财务
    Keyword::Sub("revenue"),
    Keyword::Sub("funding"),
    Keyword::Sub("valuation"),
    Keyword::Sub("investor"),
    Keyword::Word("arr"),
    Keyword::Word("mrr"),
    // 地理
    Keyword::Word("city"),
    Keyword::Word("country"),
    Keyword::Word("state"),
    Keyword::Word("region"),
    Keyword::Sub("address"),
    Keyword::Sub("location"),
    Keyword::Sub("headquarter"),
    Keyword::Word("hq"),
    Keyword::Word("zip"),
    Keyword::Sub("postal"),
];

/// 渠道分区的列始终属于线索
pub fn classify_entity(normalized: &str, section: Section) -> TargetEntity {
    if section != Section::General {
        return TargetEntity::Primary;
    }
    if any_keyword(SECONDARY_ENTITY_KEYWORDS, normalized) {
        TargetEntity::Secondary
    } else {
        TargetEntity::Primary
    }
}

// ==========================================
// 渠道状态关键字表（单元格文本 → 枚举）
// ==========================================
#[derive(Debug)]
pub struct StatusRule {
    pub any_of: &'static [&'static str],
    pub none_of: &'static [&'static str],
    pub status: ChannelStatus,
}

// 前三条为核心顺序 repl → open → sent（不含 not），其余关键字排在其后
pub const CHANNEL_STATUS_RULES: &[StatusRule] = &[
    StatusRule {
        any_of: &["repl"],
        none_of: &[],
        status: ChannelStatus::Replied,
    },
    StatusRule {
        any_of: &["open"],
        none_of: &[],
        status: ChannelStatus::Opened,
    },
    StatusRule {
        any_of: &["sent"],
        none_of: &["not"],
        status: ChannelStatus::Sent,
    },
    StatusRule {
        any_of: &["bounce", "undeliver"],
        none_of: &[],
        status: ChannelStatus::Bounced,
    },
    StatusRule {
        any_of: &["connect", "accepted"],
        none_of: &["not"],
        status: ChannelStatus::Connected,
    },
    StatusRule {
        any_of: &["responded", "answered"],
        none_of: &["unanswered"],
        status: ChannelStatus::Replied,
    },
    StatusRule {
        any_of: &["deliver"],
        none_of: &["not"],
        status: ChannelStatus::Sent,
    },
    StatusRule {
        any_of: &["pending", "queued", "scheduled"],
        none_of: &[],
        status: ChannelStatus::Pending,
    },
    StatusRule {
        any_of: &["not sent", "not contacted", "not connected", "to do", "todo"],
        none_of: &[],
        status: ChannelStatus::NotContacted,
    },
];

/// 单元格文本 → 渠道状态；无命中返回 None（不报错）
pub fn classify_channel_status(cell: &str) -> Option<ChannelStatus> {
    let text = cell.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }
    CHANNEL_STATUS_RULES
        .iter()
        .find(|rule| {
            rule.any_of.iter().any(|k| text.contains(k))
                && !rule.none_of.iter().any(|k| text.contains(k))
        })
        .map(|rule| rule.status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Company_Name "), "company name");
        assert_eq!(normalize_header("LinkedIn   Status"), "linkedin status");
    }

    #[test]
    fn test_standard_field_exact_before_substring() {
        assert_eq!(match_standard_field("email"), Some(StandardField::Email));
        assert_eq!(match_standard_field("company name"), Some(StandardField::CompanyName));
        assert_eq!(match_standard_field("linkedin"), Some(StandardField::LinkedinUrl));
        assert_eq!(match_standard_field("status"), Some(StandardField::Stage));
    }

    #[test]
    fn test_standard_field_substring_priority() {
        assert_eq!(match_standard_field("linkedin status"), Some(StandardField::LinkedinStatus));
        assert_eq!(match_standard_field("email status"), Some(StandardField::EmailStatus));
        assert_eq!(match_standard_field("mobile phone"), Some(StandardField::Phone));
        // "contact name" 同时包含于 Name 规则，名字优先
        assert_eq!(match_standard_field("primary contact name"), Some(StandardField::Name));
    }

    #[test]
    fn test_first_and_last_name_headers() {
        assert_eq!(match_standard_field("first name"), Some(StandardField::Name));
        assert_eq!(match_standard_field("contact first name"), Some(StandardField::Name));
        assert_eq!(match_standard_field("last name"), Some(StandardField::LastName));
        assert_eq!(match_standard_field("surname"), Some(StandardField::LastName));
    }

    #[test]
    fn test_standard_field_no_match() {
        assert_eq!(match_standard_field("industry"), None);
        assert_eq!(match_standard_field("email subject"), None);
    }

    #[test]
    fn test_classify_section() {
        assert_eq!(classify_section("linkedin note"), Section::Linkedin);
        assert_eq!(classify_section("email subject"), Section::Email);
        assert_eq!(classify_section("mailing address"), Section::General);
        assert_eq!(classify_section("industry"), Section::General);
    }

    #[test]
    fn test_classify_entity() {
        assert_eq!(classify_entity("industry", Section::General), TargetEntity::Secondary);
        assert_eq!(classify_entity("annual revenue", Section::General), TargetEntity::Secondary);
        assert_eq!(classify_entity("hq city", Section::General), TargetEntity::Secondary);
        assert_eq!(classify_entity("carrier", Section::General), TargetEntity::Primary);
        assert_eq!(classify_entity("lead score", Section::General), TargetEntity::Primary);
        assert_eq!(classify_entity("company note", Section::Linkedin), TargetEntity::Primary);
    }

    #[test]
    fn test_classify_channel_status() {
        assert_eq!(classify_channel_status("Replied by client"), Some(ChannelStatus::Replied));
        assert_eq!(classify_channel_status("OPENED"), Some(ChannelStatus::Opened));
        assert_eq!(classify_channel_status("sent"), Some(ChannelStatus::Sent));
        assert_eq!(classify_channel_status("not sent"), Some(ChannelStatus::NotContacted));
        assert_eq!(classify_channel_status("Connected"), Some(ChannelStatus::Connected));
        assert_eq!(classify_channel_status("Not connected"), Some(ChannelStatus::NotContacted));
        assert_eq!(classify_channel_status("bounced"), Some(ChannelStatus::Bounced));
        assert_eq!(classify_channel_status("Delivered"), Some(ChannelStatus::Sent));
        assert_eq!(classify_channel_status("???"), None);
        assert_eq!(classify_channel_status("   "), None);
    }

    #[test]
    fn test_channel_status_first_match_order() {
        // 含 repl 即为 Replied，先于 open/sent 判断，不看否定词
        assert_eq!(classify_channel_status("Not replied yet"), Some(ChannelStatus::Replied));
        assert_eq!(classify_channel_status("Opened, not replied"), Some(ChannelStatus::Replied));
        assert_eq!(classify_channel_status("no reply"), Some(ChannelStatus::Replied));
        assert_eq!(classify_channel_status("Sent, opened"), Some(ChannelStatus::Opened));
        // 附加关键字排在核心三条之后
        assert_eq!(classify_channel_status("sent, bounced"), Some(ChannelStatus::Sent));
        assert_eq!(classify_channel_status("unanswered"), None);
    }
}
