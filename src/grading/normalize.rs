//! 评分数值归一化
//!
//! 两个入口：
//! - `normalize_points`: 把模型提出的点数列表缩放到恰好等于总分，
//!   每项至少 1 分，供评分标准推断使用；
//! - `resolve_item_scores`: 以评分标准为准逐项裁剪模型返回的得分，
//!   保证总分永远不超过标准总分，供评分引擎使用。

use crate::models::rubrics::entities::Rubric;

use super::schema::{ItemStatus, RubricScore};

/// 把模型提出的点数归一化为总和恰好等于 total 的正整数列表
///
/// 返回空列表表示无法构建评分标准（输入为空或总和非正），
/// 调用方必须视为硬失败。非空结果满足 sum == total 且每项 >= 1。
///
/// 缩放后的舍入残差全部落在最后一项上。这是沿用的兼容性策略，
/// 不是公平分配；评分标准只有 3-7 项，精确性比公平性重要。
pub fn normalize_points(raw_points: &[Option<f64>], total: i64) -> Vec<i64> {
    let mut points: Vec<i64> = raw_points
        .iter()
        .filter_map(|p| *p)
        .map(|p| (p.round() as i64).max(1))
        .collect();

    if points.is_empty() {
        return Vec::new();
    }

    let sum: i64 = points.iter().sum();
    if sum <= 0 {
        return Vec::new();
    }

    if sum != total {
        let scale = total as f64 / sum as f64;
        points = points
            .iter()
            .map(|p| ((*p as f64 * scale).round() as i64).max(1))
            .collect();
        let delta = total - points.iter().sum::<i64>();
        let last = points.len() - 1;
        points[last] = (points[last] + delta).max(1);
    }

    points
}

/// 逐项归一化评分结果
///
/// 按评分标准的顺序迭代（标准是权威，模型可能漏项或乱序），
/// 标签精确匹配（大小写与空白敏感）；缺失项按 partial/0 处理。
/// correct 给满分，incorrect 给零分，partial 裁剪到 [0, points]。
/// 返回归一化后的逐项得分与总分，总分必然 <= 标准总分。
pub fn resolve_item_scores(rubric: &Rubric, scores: &[RubricScore]) -> (Vec<RubricScore>, f64) {
    let mut normalized = Vec::with_capacity(rubric.items.len());
    let mut total = 0.0;

    for item in &rubric.items {
        let incoming = scores.iter().find(|s| s.label == item.label);
        let raw_score = incoming.map(|s| s.score).unwrap_or(0.0);
        let status = incoming.map(|s| s.status).unwrap_or(ItemStatus::Partial);
        let max_points = item.points as f64;

        let score = match status {
            ItemStatus::Correct => max_points,
            ItemStatus::Incorrect => 0.0,
            ItemStatus::Partial => raw_score.clamp(0.0, max_points),
        };

        normalized.push(RubricScore {
            label: item.label.clone(),
            score,
            notes: incoming.and_then(|s| s.notes.clone()),
            status,
        });
        total += score;
    }

    (normalized, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rubrics::entities::RubricItem;

    fn rubric_with_points(points: &[i64]) -> Rubric {
        Rubric {
            id: 1,
            problem_id: 1,
            version: 1,
            total_points: points.iter().sum(),
            items: points
                .iter()
                .enumerate()
                .map(|(idx, p)| RubricItem {
                    id: idx as i64 + 1,
                    label: format!("Criterion {}", idx + 1),
                    points: *p,
                    sort_order: idx as i64 + 1,
                })
                .collect(),
            created_at: chrono::Utc::now(),
        }
    }

    fn score(label: &str, s: f64, status: ItemStatus) -> RubricScore {
        RubricScore {
            label: label.to_string(),
            score: s,
            notes: None,
            status,
        }
    }

    #[test]
    fn test_normalize_exact_sum_passthrough() {
        let raw = [Some(3.0), Some(3.0), Some(4.0)];
        assert_eq!(normalize_points(&raw, 10), vec![3, 3, 4]);
    }

    #[test]
    fn test_normalize_scales_to_total() {
        let raw = [Some(5.0), Some(5.0)];
        let points = normalize_points(&raw, 30);
        assert_eq!(points.iter().sum::<i64>(), 30);
        assert!(points.iter().all(|p| *p >= 1));
    }

    #[test]
    fn test_normalize_residual_lands_on_last_item() {
        // 3 项均分 10 分：缩放后各 3，残差 1 加到最后一项
        let raw = [Some(1.0), Some(1.0), Some(1.0)];
        assert_eq!(normalize_points(&raw, 10), vec![3, 3, 4]);
    }

    #[test]
    fn test_normalize_skips_absent_values() {
        let raw = [Some(4.0), None, Some(6.0)];
        let points = normalize_points(&raw, 10);
        assert_eq!(points, vec![4, 6]);
    }

    #[test]
    fn test_normalize_empty_input_returns_empty() {
        assert!(normalize_points(&[], 10).is_empty());
        assert!(normalize_points(&[None, None], 10).is_empty());
    }

    #[test]
    fn test_normalize_sum_invariant_over_many_inputs() {
        // 长度 1-10、总分 1-1000 的抽样网格。每项 >= 1 恒成立；
        // 总和恰好等于 total，除非 1 分下限在最后一项上与总和约束冲突
        // （此时最后一项被压在 1，总和只能偏高）。
        for len in 1..=10usize {
            for total in [1i64, 2, 7, 10, 17, 99, 500, 1000] {
                let raw: Vec<Option<f64>> =
                    (0..len).map(|i| Some((i as f64 + 0.7) * 1.3)).collect();
                let points = normalize_points(&raw, total);
                assert!(!points.is_empty());
                assert!(points.iter().all(|p| *p >= 1));
                let sum: i64 = points.iter().sum();
                if sum != total {
                    assert_eq!(*points.last().unwrap(), 1, "len={len} total={total}");
                    assert!(sum > total);
                }
            }
        }
        // 总分远大于项数时下限不再生效，总和严格相等
        for len in 1..=10usize {
            for total in [100i64, 500, 1000] {
                let raw: Vec<Option<f64>> =
                    (0..len).map(|i| Some((i as f64 + 0.7) * 1.3)).collect();
                let points = normalize_points(&raw, total);
                assert_eq!(points.iter().sum::<i64>(), total, "len={len} total={total}");
            }
        }
    }

    #[test]
    fn test_normalize_sum_can_differ_only_when_floor_binds() {
        // total 小于项数时 1 分下限与总和约束冲突，最后一项被压到 1
        let raw = [Some(1.0), Some(1.0), Some(1.0)];
        let points = normalize_points(&raw, 2);
        assert!(points.iter().all(|p| *p >= 1));
    }

    #[test]
    fn test_resolve_clamps_partial_to_item_points() {
        let rubric = rubric_with_points(&[5, 5]);
        let scores = vec![
            score("Criterion 1", 99.0, ItemStatus::Partial),
            score("Criterion 2", -3.0, ItemStatus::Partial),
        ];
        let (normalized, total) = resolve_item_scores(&rubric, &scores);
        assert_eq!(normalized[0].score, 5.0);
        assert_eq!(normalized[1].score, 0.0);
        assert_eq!(total, 5.0);
    }

    #[test]
    fn test_resolve_status_overrides_raw_score() {
        let rubric = rubric_with_points(&[4, 6]);
        let scores = vec![
            // correct 且报 0 分 -> 仍给满分
            score("Criterion 1", 0.0, ItemStatus::Correct),
            // incorrect 且报满分 -> 仍给零分
            score("Criterion 2", 6.0, ItemStatus::Incorrect),
        ];
        let (normalized, total) = resolve_item_scores(&rubric, &scores);
        assert_eq!(normalized[0].score, 4.0);
        assert_eq!(normalized[1].score, 0.0);
        assert_eq!(total, 4.0);
    }

    #[test]
    fn test_resolve_missing_item_defaults_to_partial_zero() {
        let rubric = rubric_with_points(&[3, 7]);
        let scores = vec![score("Criterion 1", 3.0, ItemStatus::Correct)];
        let (normalized, total) = resolve_item_scores(&rubric, &scores);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[1].status, ItemStatus::Partial);
        assert_eq!(normalized[1].score, 0.0);
        assert_eq!(total, 3.0);
    }

    #[test]
    fn test_resolve_label_match_is_exact() {
        // 大小写/空白不同的标签不匹配，按缺失处理
        let rubric = rubric_with_points(&[10]);
        let scores = vec![score("criterion 1", 10.0, ItemStatus::Correct)];
        let (normalized, total) = resolve_item_scores(&rubric, &scores);
        assert_eq!(normalized[0].score, 0.0);
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_resolve_total_never_exceeds_rubric_total() {
        let rubric = rubric_with_points(&[2, 3, 5]);
        let scores = vec![
            score("Criterion 1", 100.0, ItemStatus::Partial),
            score("Criterion 2", 100.0, ItemStatus::Correct),
            score("Criterion 3", 100.0, ItemStatus::Partial),
        ];
        let (normalized, total) = resolve_item_scores(&rubric, &scores);
        assert!(total <= rubric.total_points as f64);
        for (n, item) in normalized.iter().zip(&rubric.items) {
            assert!(n.score >= 0.0 && n.score <= item.points as f64);
        }
    }
}
