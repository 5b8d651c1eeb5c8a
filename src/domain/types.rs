// ==========================================
// 销售线索 CRM - 领域类型定义
// ==========================================
// 职责: 记录种类、字段分区、目标实体、渠道状态枚举
// 红线: 纯类型定义，不含 I/O
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// RecordKind - 文档存储中的记录种类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Lead,    // 主记录：线索
    Company, // 从属实体：公司
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Lead => "lead",
            RecordKind::Company => "company",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Section - 字段功能分区
// ==========================================
// 两个外联渠道各占一个分区，其余归入 General
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    General,
    Linkedin, // 渠道 A
    Email,    // 渠道 B
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::General => "general",
            Section::Linkedin => "linkedin",
            Section::Email => "email",
        }
    }

    /// 对应的外联渠道（General 无渠道）
    pub fn channel(&self) -> Option<Channel> {
        match self {
            Section::General => None,
            Section::Linkedin => Some(Channel::Linkedin),
            Section::Email => Some(Channel::Email),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "general" => Some(Section::General),
            "linkedin" => Some(Section::Linkedin),
            "email" => Some(Section::Email),
            _ => None,
        }
    }
}

// ==========================================
// TargetEntity - 映射目标实体
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetEntity {
    Primary,   // 写入线索
    Secondary, // 写入公司
}

// ==========================================
// Channel - 外联渠道
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Linkedin,
    Email,
}

// ==========================================
// ChannelStatus - 渠道外联状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    NotContacted,
    Pending,
    Sent,
    Opened,
    Replied,
    Bounced,
    Connected,
}
