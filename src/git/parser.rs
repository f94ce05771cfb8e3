//! Line parsers for the machine-readable git output formats the services
//! request. All record formats use the unit separator so commit subjects
//! containing spaces or punctuation never break field splitting.

/// Field separator used in `--format` strings; effectively cannot appear
/// in git metadata.
pub const FIELD_SEP: char = '\u{1f}';

/// One file line from `status --porcelain=v1`.
///
/// `index_status` and `work_status` are the raw X and Y characters; the
/// staged and unstaged views are computed independently, so a partially
/// staged file shows up in both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub index_status: char,
    pub work_status: char,
}

impl FileEntry {
    pub fn is_staged(&self) -> bool {
        !matches!(self.index_status, '?' | ' ' | '!')
    }

    pub fn is_unstaged(&self) -> bool {
        !matches!(self.work_status, ' ' | '!') && self.index_status != '?'
    }

    pub fn is_untracked(&self) -> bool {
        self.index_status == '?' && self.work_status == '?'
    }
}

/// Parsed `status --porcelain=v1 --branch` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub branch: String,
    pub ahead: u32,
    pub behind: u32,
    pub entries: Vec<FileEntry>,
}

/// One commit from the log format `%H %h %an %ae %ci %s` (sep-joined).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEntry {
    pub sha: String,
    pub short_sha: String,
    pub author: String,
    pub email: String,
    pub date: String,
    pub message: String,
}

/// One local branch from `for-each-ref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchEntry {
    pub name: String,
    pub is_current: bool,
    pub last_commit_sha: String,
    pub last_commit_message: String,
}

/// One configured remote with its fetch/push URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub fetch_url: String,
    pub push_url: String,
}

/// One decorated log entry for UI graph rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEntry {
    pub short_sha: String,
    pub message: String,
    pub author: String,
    pub date: String,
    pub refs: Vec<String>,
}

/// Parse `status --porcelain=v1 --branch` output.
///
/// Malformed lines are skipped rather than failing the whole parse; git
/// occasionally grows new line types and a status view should degrade, not
/// error.
pub fn parse_status(output: &str) -> StatusReport {
    let mut branch = String::from("unknown");
    let mut ahead = 0;
    let mut behind = 0;
    let mut entries = Vec::new();

    for line in output.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            let header = header.strip_prefix("No commits yet on ").unwrap_or(header);
            branch = header
                .split("...")
                .next()
                .unwrap_or(header)
                .to_string();
            if let (Some(open), Some(close)) = (header.find('['), header.rfind(']')) {
                for segment in header[open + 1..close].split(',') {
                    let segment = segment.trim();
                    if let Some(n) = segment.strip_prefix("ahead ") {
                        ahead = n.parse().unwrap_or(0);
                    } else if let Some(n) = segment.strip_prefix("behind ") {
                        behind = n.parse().unwrap_or(0);
                    }
                }
            }
            continue;
        }

        // XY<space>path; renames carry "old -> new" and the new path wins.
        if line.len() < 4 {
            continue;
        }
        let mut chars = line.chars();
        let (Some(x), Some(y)) = (chars.next(), chars.next()) else {
            continue;
        };
        let path_part = &line[3..];
        let path = path_part
            .rsplit(" -> ")
            .next()
            .unwrap_or(path_part)
            .to_string();
        entries.push(FileEntry {
            path,
            index_status: x,
            work_status: y,
        });
    }

    StatusReport {
        branch,
        ahead,
        behind,
        entries,
    }
}

/// Parse sep-joined log output into commits. Lines with the wrong field
/// count are skipped.
pub fn parse_log(output: &str) -> Vec<CommitEntry> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(FIELD_SEP).collect();
            if parts.len() != 6 {
                return None;
            }
            Some(CommitEntry {
                sha: parts[0].to_string(),
                short_sha: parts[1].to_string(),
                author: parts[2].to_string(),
                email: parts[3].to_string(),
                date: parts[4].to_string(),
                message: parts[5].to_string(),
            })
        })
        .collect()
}

/// Parse sep-joined `for-each-ref` output into local branches.
pub fn parse_branches(output: &str) -> Vec<BranchEntry> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(FIELD_SEP).collect();
            if parts.len() != 4 {
                return None;
            }
            Some(BranchEntry {
                name: parts[0].to_string(),
                is_current: parts[1] == "*",
                last_commit_sha: parts[2].to_string(),
                last_commit_message: parts[3].to_string(),
            })
        })
        .collect()
}

/// Parse `remote -v` output, pairing fetch and push URLs per remote.
pub fn parse_remotes(output: &str) -> Vec<RemoteEntry> {
    let mut remotes: Vec<RemoteEntry> = Vec::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        let (name, url, direction) = (parts[0], parts[1], parts[2].trim_matches(['(', ')']));

        let idx = match remotes.iter().position(|r| r.name == name) {
            Some(idx) => idx,
            None => {
                remotes.push(RemoteEntry {
                    name: name.to_string(),
                    fetch_url: String::new(),
                    push_url: String::new(),
                });
                remotes.len() - 1
            }
        };
        let entry = &mut remotes[idx];
        match direction {
            "fetch" => entry.fetch_url = url.to_string(),
            "push" => entry.push_url = url.to_string(),
            _ => {}
        }
    }

    remotes
}

/// Parse sep-joined decorated log output into graph entries.
pub fn parse_graph(output: &str) -> Vec<GraphEntry> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(FIELD_SEP).collect();
            if parts.len() != 5 {
                return None;
            }
            let refs = parts[4]
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
            Some(GraphEntry {
                short_sha: parts[0].to_string(),
                message: parts[1].to_string(),
                author: parts[2].to_string(),
                date: parts[3].to_string(),
                refs,
            })
        })
        .collect()
}
