//! One training job: benchmark preparation, routine execution, upload.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use log::{debug, info};
use rand::{Rng, seq::SliceRandom};

use predictor::IdMap;
use store::ArtifactStore;
use wire::specs::queue::JobSpec;

use crate::error::{Result, TrainErr};

const TRAIN_RATIO: f64 = 0.8;
const TEST_RATIO: f64 = 0.1;

const ENTITY2ID_FILE: &str = "entity2id.txt";
const RELATION2ID_FILE: &str = "relation2id.txt";
const TRAIN2ID_FILE: &str = "train2id.txt";
const VALID2ID_FILE: &str = "valid2id.txt";
const TEST2ID_FILE: &str = "test2id.txt";

/// The externally provided train-and-evaluate step.
///
/// Runs against a prepared benchmark directory and returns the
/// parameter-table JSON file it produced.
pub trait TrainRoutine: Send + Sync {
    fn run(&self, benchmark_dir: &Path, checkpoint_dir: &Path) -> Result<PathBuf>;
}

/// Delegates training to an external command.
///
/// The command receives the benchmark and checkpoint directories as its
/// two arguments and must leave the parameter tables at
/// `<checkpoint>/param.json`.
pub struct CommandRoutine {
    program: String,
}

impl CommandRoutine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl TrainRoutine for CommandRoutine {
    fn run(&self, benchmark_dir: &Path, checkpoint_dir: &Path) -> Result<PathBuf> {
        let status = Command::new(&self.program)
            .arg(benchmark_dir)
            .arg(checkpoint_dir)
            .status()?;

        if !status.success() {
            return Err(TrainErr::Routine(format!(
                "{} exited with {status}",
                self.program
            )));
        }

        Ok(checkpoint_dir.join("param.json"))
    }
}

/// A `[head_idx, tail_idx, relation_idx]` triple.
type IdTriple = [usize; 3];

/// One queued training job bound to its per-gid working directories.
pub struct TrainJob {
    spec: JobSpec,
    benchmark_dir: PathBuf,
    checkpoint_dir: PathBuf,
}

impl TrainJob {
    /// # Arguments
    /// * `spec` - The parsed queue payload.
    /// * `benchmarks_root` - Parent of the per-gid benchmark directories.
    /// * `checkpoints_root` - Parent of the per-gid checkpoint directories.
    pub fn new(spec: JobSpec, benchmarks_root: &Path, checkpoints_root: &Path) -> Self {
        let benchmark_dir = benchmarks_root.join(spec.gid.to_string());
        let checkpoint_dir = checkpoints_root.join(spec.gid.to_string());

        Self {
            spec,
            benchmark_dir,
            checkpoint_dir,
        }
    }

    pub fn benchmark_dir(&self) -> &Path {
        &self.benchmark_dir
    }

    /// Rebuilds the per-gid benchmark directory from the job's triples.
    ///
    /// The directory is removed wholesale first, so re-running a job
    /// never mixes files from an earlier run. Entities and relations are
    /// indexed in first-seen order, then the shuffled triples are split
    /// 0.8/0.1/0.1 into train/test/valid and the evaluation files are
    /// derived from the split.
    pub fn prepare_data(&self, rng: &mut impl Rng) -> Result<()> {
        let triples = &self.spec.train_triples;
        if triples.is_empty() {
            return Err(TrainErr::EmptyJob);
        }

        if self.benchmark_dir.exists() {
            fs::remove_dir_all(&self.benchmark_dir)?;
        }
        fs::create_dir_all(&self.benchmark_dir)?;

        let mut entity_names = Vec::new();
        let mut relation_names = Vec::new();
        let mut seen_entities = HashSet::new();
        let mut seen_relations = HashSet::new();

        for (head, tail, relation) in triples {
            if seen_entities.insert(head) {
                entity_names.push(head.clone());
            }
            if seen_entities.insert(tail) {
                entity_names.push(tail.clone());
            }
            if seen_relations.insert(relation) {
                relation_names.push(relation.clone());
            }
        }

        // Deduplicated just above, the bijection cannot fail.
        let entities = IdMap::from_names(entity_names).unwrap();
        let relations = IdMap::from_names(relation_names).unwrap();

        fs::write(self.benchmark_dir.join(ENTITY2ID_FILE), entities.to_text())?;
        fs::write(
            self.benchmark_dir.join(RELATION2ID_FILE),
            relations.to_text(),
        )?;

        let mut indexed: Vec<IdTriple> = triples
            .iter()
            .map(|(head, tail, relation)| {
                // Every name was indexed in the loop above.
                [
                    entities.index_of(head).unwrap(),
                    entities.index_of(tail).unwrap(),
                    relations.index_of(relation).unwrap(),
                ]
            })
            .collect();
        indexed.shuffle(rng);

        let n = indexed.len();
        let train_num = ((n as f64 * TRAIN_RATIO) as usize).max(1).min(n);
        let test_num = ((n as f64 * TEST_RATIO) as usize).max(1);

        let train = &indexed[..train_num];
        let test = &indexed[train_num..(train_num + test_num).min(n)];
        let valid = &indexed[n.saturating_sub(test_num)..];
        debug!(
            "prepared splits for gid {}: {} train, {} valid, {} test",
            self.spec.gid,
            train.len(),
            valid.len(),
            test.len()
        );

        self.write_split(TRAIN2ID_FILE, train)?;
        self.write_split(VALID2ID_FILE, valid)?;
        self.write_split(TEST2ID_FILE, test)?;

        self.write_evaluation_files(train, valid, test)?;
        Ok(())
    }

    /// Runs the full job: prepare, train, upload.
    ///
    /// The upload stages the three payload columns and flips
    /// `available` on last, so a partially uploaded artifact is never
    /// eligible remotely.
    pub async fn run<T, S>(&self, routine: &T, store: &S) -> Result<()>
    where
        T: TrainRoutine,
        S: ArtifactStore,
    {
        self.prepare_data(&mut rand::rng())?;

        fs::create_dir_all(&self.checkpoint_dir)?;
        let param_path = routine.run(&self.benchmark_dir, &self.checkpoint_dir)?;

        let params = fs::read_to_string(&param_path)?;
        let entity2id = fs::read_to_string(self.benchmark_dir.join(ENTITY2ID_FILE))?;
        let relation2id = fs::read_to_string(self.benchmark_dir.join(RELATION2ID_FILE))?;

        info!(
            "uploading artifact for ({}, {}): params {} bytes",
            self.spec.gid,
            self.spec.model_name,
            params.len()
        );
        store
            .upload(
                self.spec.gid,
                &self.spec.model_name,
                &params,
                &entity2id,
                &relation2id,
            )
            .await?;

        Ok(())
    }

    fn write_split(&self, file: &str, split: &[IdTriple]) -> Result<()> {
        let mut out = String::new();

        // Writing to a String cannot fail.
        writeln!(out, "{}", split.len()).unwrap();
        for [head, tail, relation] in split {
            writeln!(out, "{head} {tail} {relation}").unwrap();
        }

        fs::write(self.benchmark_dir.join(file), out)?;
        Ok(())
    }

    /// Derives `type_constrain.txt`, the arity-class test files and
    /// `test2id_all.txt` from the three splits.
    fn write_evaluation_files(
        &self,
        train: &[IdTriple],
        valid: &[IdTriple],
        test: &[IdTriple],
    ) -> Result<()> {
        let mut tails_per_head_rel: HashMap<(usize, usize), usize> = HashMap::new();
        let mut heads_per_rel_tail: HashMap<(usize, usize), usize> = HashMap::new();
        let mut rel_heads: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
        let mut rel_tails: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();

        for &[head, tail, relation] in train.iter().chain(valid).chain(test) {
            *tails_per_head_rel.entry((head, relation)).or_default() += 1;
            *heads_per_rel_tail.entry((relation, tail)).or_default() += 1;
            rel_heads.entry(relation).or_default().insert(head);
            rel_tails.entry(relation).or_default().insert(tail);
        }

        let mut out = String::new();
        writeln!(out, "{}", rel_heads.len()).unwrap();
        for (relation, heads) in &rel_heads {
            write!(out, "{relation}\t{}", heads.len()).unwrap();
            for head in heads {
                write!(out, "\t{head}").unwrap();
            }
            out.push('\n');

            let tails = &rel_tails[relation];
            write!(out, "{relation}\t{}", tails.len()).unwrap();
            for tail in tails {
                write!(out, "\t{tail}").unwrap();
            }
            out.push('\n');
        }
        fs::write(self.benchmark_dir.join("type_constrain.txt"), out)?;

        // Average tail fan-out per (head, relation) group and head
        // fan-out per (relation, tail) group, keyed by relation.
        let mut tail_sums: HashMap<usize, (usize, usize)> = HashMap::new();
        for ((_, relation), count) in &tails_per_head_rel {
            let (sum, groups) = tail_sums.entry(*relation).or_default();
            *sum += count;
            *groups += 1;
        }
        let mut head_sums: HashMap<usize, (usize, usize)> = HashMap::new();
        for ((relation, _), count) in &heads_per_rel_tail {
            let (sum, groups) = head_sums.entry(*relation).or_default();
            *sum += count;
            *groups += 1;
        }

        let class_of = |relation: usize| -> usize {
            let (tail_sum, tail_groups) = tail_sums[&relation];
            let (head_sum, head_groups) = head_sums[&relation];
            let avg_tails = tail_sum as f64 / tail_groups as f64;
            let avg_heads = head_sum as f64 / head_groups as f64;

            match (avg_tails >= 1.5, avg_heads >= 1.5) {
                (false, false) => 0, // 1-1
                (true, false) => 1,  // 1-n
                (false, true) => 2,  // n-1
                (true, true) => 3,   // n-n
            }
        };

        let mut classes: [Vec<IdTriple>; 4] = Default::default();
        for &triple in test {
            classes[class_of(triple[2])].push(triple);
        }

        for (class, file) in ["1-1.txt", "1-n.txt", "n-1.txt", "n-n.txt"]
            .iter()
            .enumerate()
        {
            let mut out = String::new();
            writeln!(out, "{}", classes[class].len()).unwrap();
            for [head, tail, relation] in &classes[class] {
                writeln!(out, "{head} {tail} {relation}").unwrap();
            }
            fs::write(self.benchmark_dir.join(file), out)?;
        }

        let mut out = String::new();
        writeln!(out, "{}", test.len()).unwrap();
        for &[head, tail, relation] in test {
            writeln!(out, "{}\t{head} {tail} {relation}", class_of(relation)).unwrap();
        }
        fs::write(self.benchmark_dir.join("test2id_all.txt"), out)?;

        Ok(())
    }
}
