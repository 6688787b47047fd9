use crate::constants::git;
use crate::state::RepoState;

/// 一次仓库状态查询的原始结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus {
    pub branch: String,
    /// 本地 HEAD 的提交时间（Unix 秒）
    pub local_timestamp: i64,
    /// 远程主分支的提交时间（Unix 秒）
    pub remote_timestamp: i64,
    pub dirty: bool,
    pub untracked: bool,
}

/// 按优先级归类仓库状态
///
/// 1. 不在主分支：本地修改已提交到独立分支
/// 2. 本地提交早于远程：有可用更新
/// 3. 存在已跟踪文件的修改或未跟踪文件：本地有改动
/// 4. 其余情况：已是最新
pub fn classify_repo_state(status: &RepoStatus) -> RepoState {
    if status.branch != git::MAIN_BRANCH {
        RepoState::ChangesCommitted
    } else if status.local_timestamp < status.remote_timestamp {
        RepoState::UpdateAvailable
    } else if status.dirty || status.untracked {
        RepoState::ChangedLocally
    } else {
        RepoState::UpToDate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(branch: &str, local: i64, remote: i64, dirty: bool, untracked: bool) -> RepoStatus {
        RepoStatus {
            branch: branch.to_string(),
            local_timestamp: local,
            remote_timestamp: remote,
            dirty,
            untracked,
        }
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(
            classify_repo_state(&status("hive-1-20240101", 1, 2, true, true)),
            RepoState::ChangesCommitted
        );
        assert_eq!(
            classify_repo_state(&status("main", 1, 2, true, false)),
            RepoState::UpdateAvailable
        );
        assert_eq!(
            classify_repo_state(&status("main", 2, 2, true, false)),
            RepoState::ChangedLocally
        );
        assert_eq!(
            classify_repo_state(&status("main", 2, 2, false, true)),
            RepoState::ChangedLocally
        );
        assert_eq!(
            classify_repo_state(&status("main", 3, 2, false, false)),
            RepoState::UpToDate
        );
    }

    #[test]
    fn test_classification_is_total_and_deterministic() {
        let allowed = [
            RepoState::ChangesCommitted,
            RepoState::UpdateAvailable,
            RepoState::ChangedLocally,
            RepoState::UpToDate,
        ];
        for branch in ["main", "feature", ""] {
            for (local, remote) in [(0, 0), (1, 2), (2, 1), (i64::MIN, i64::MAX)] {
                for dirty in [false, true] {
                    for untracked in [false, true] {
                        let input = status(branch, local, remote, dirty, untracked);
                        let first = classify_repo_state(&input);
                        assert!(allowed.contains(&first));
                        assert_eq!(first, classify_repo_state(&input.clone()));
                    }
                }
            }
        }
    }
}
