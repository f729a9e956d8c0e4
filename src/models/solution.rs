//! 解题步骤与校验结果

use serde::{Deserialize, Serialize};

/// 单个解题步骤
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionStep {
    /// 步骤编号（从 1 开始，连续）
    pub step_number: u32,
    /// 文字讲解（已经过两遍纠错）
    pub explanation: String,
    /// LaTeX 公式
    pub formula: String,
}

/// 一道题的完整解题步骤，生成后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolutionSet {
    steps: Vec<SolutionStep>,
}

impl SolutionSet {
    /// 按顺序重新编号，保证 step_number 从 1 开始连续
    pub fn new(steps: Vec<SolutionStep>) -> Self {
        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(idx, step)| SolutionStep {
                step_number: idx as u32 + 1,
                ..step
            })
            .collect();
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SolutionStep> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[SolutionStep] {
        &self.steps
    }

    /// 拼接全部步骤（讲解 + 公式），作为校验的输入
    pub fn joined_text(&self) -> String {
        self.steps
            .iter()
            .map(|step| {
                format!(
                    "步骤 {}: {}\n{}",
                    step.step_number, step.explanation, step.formula
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// 最终校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub is_correct: bool,
    pub verification_details: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(n: u32, explanation: &str, formula: &str) -> SolutionStep {
        SolutionStep {
            step_number: n,
            explanation: explanation.to_string(),
            formula: formula.to_string(),
        }
    }

    #[test]
    fn test_step_numbers_are_renumbered_contiguously() {
        let set = SolutionSet::new(vec![step(3, "a", "x"), step(7, "b", "y"), step(7, "c", "z")]);
        let numbers: Vec<u32> = set.steps().iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(set.get(1).unwrap().explanation, "b");
    }

    #[test]
    fn test_joined_text_keeps_order() {
        let set = SolutionSet::new(vec![
            step(1, "Subtract 5", "2x = 10"),
            step(2, "Divide by 2", "x = 5"),
        ]);
        let text = set.joined_text();
        let first = text.find("Subtract 5").unwrap();
        let second = text.find("x = 5").unwrap();
        assert!(first < second);
        assert!(text.contains("2x = 10"));
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let json = serde_json::to_value(step(1, "e", "f")).unwrap();
        assert_eq!(json["stepNumber"], 1);
        let verdict = VerificationResult {
            is_correct: true,
            verification_details: "ok".into(),
        };
        let json = serde_json::to_value(verdict).unwrap();
        assert_eq!(json["isCorrect"], true);
    }
}
