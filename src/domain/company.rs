// ==========================================
// 销售线索 CRM - 公司（从属实体）领域模型
// ==========================================
// 职责: 导入过程中按公司累积的字段更新
// 合并规则: 后到的行按字段覆盖，嵌套对象浅合并
// ==========================================

use crate::domain::lead::normalize_name;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 公司自定义字段在文档中的嵌套键
pub const CUSTOM_FIELDS_KEY: &str = "custom_fields";

// ==========================================
// CompanyUpdate - 公司字段更新
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyUpdate {
    pub company_key: String,      // 归一化公司名
    pub fields: Map<String, Value>, // 待合并的补丁
}

impl CompanyUpdate {
    pub fn new(company_name: &str) -> Self {
        Self {
            company_key: normalize_name(company_name),
            fields: Map::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 写入顶层字段
    pub fn set_field(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// 写入 custom_fields 嵌套对象
    pub fn set_custom_field(&mut self, key: &str, value: Value) {
        let entry = self
            .fields
            .entry(CUSTOM_FIELDS_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Some(custom) = entry.as_object_mut() {
            custom.insert(key.to_string(), value);
        }
    }

    /// 合并同一公司的另一份更新（other 为后到的行）
    pub fn merge_from(&mut self, other: CompanyUpdate) {
        merge_patch(&mut self.fields, &other.fields);
    }

    pub fn into_patch(self) -> Value {
        Value::Object(self.fields)
    }
}

/// 字段级合并：同名字段后者覆盖；两侧均为对象时浅合并一层
pub fn merge_patch(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                for (k, v) in incoming {
                    existing.insert(k.clone(), v.clone());
                }
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_last_row_wins() {
        let mut first = CompanyUpdate::new("Acme");
        first.set_field("website", json!("acme.com"));
        first.set_custom_field("industry", json!("Retail"));

        let mut second = CompanyUpdate::new("ACME ");
        second.set_field("website", json!("acme.io"));
        second.set_custom_field("employees", json!("120"));

        first.merge_from(second);

        assert_eq!(first.fields["website"], json!("acme.io"));
        assert_eq!(
            first.fields[CUSTOM_FIELDS_KEY],
            json!({"industry": "Retail", "employees": "120"})
        );
    }

    #[test]
    fn test_merge_patch_replaces_scalar_with_object() {
        let mut target = json!({"a": 1}).as_object().cloned().unwrap();
        let patch = json!({"a": {"b": 2}}).as_object().cloned().unwrap();
        merge_patch(&mut target, &patch);
        assert_eq!(Value::Object(target), json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_company_key_normalized() {
        assert_eq!(CompanyUpdate::new("  Acme Corp ").company_key, "acme corp");
    }
}
