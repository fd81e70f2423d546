//! 查询引擎配置

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 单页最大返回行数，0 表示不限
    pub max_items: usize,
    /// 跳过的行数
    pub skip_count: usize,
    /// FROM 类型是否同时匹配其子类型的对象
    pub include_subtypes: bool,
    /// 全文检索是否区分大小写
    pub case_sensitive_text: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_items: 100,
            skip_count: 0,
            include_subtypes: true,
            case_sensitive_text: false,
        }
    }
}

impl EngineConfig {
    /// 从 JSON 文件加载，缺省字段取默认值
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_skip_count(mut self, skip_count: usize) -> Self {
        self.skip_count = skip_count;
        self
    }
}
