//! Command lines for the delegated programs.
//!
//! Each function only builds a [`ToolInvocation`]; running it is the caller's
//! job. Options that shape the results (word sizes, gap penalties, coverage
//! cut-offs) are fixed here so every run aligns the same way.

use std::path::Path;

use crate::tools::ToolInvocation;

/// `seqtk trimfq IN > OUT`: trim low-quality read ends
pub fn seqtk_trimfq(input: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new("seqtk")
        .arg("trimfq")
        .arg(input)
        .stdout_to(output)
}

/// `seqtk sample -s SEED IN N > OUT`: reproducible subsample of up to `n` reads
pub fn seqtk_sample(seed: u64, input: &Path, n: u64, output: &Path) -> ToolInvocation {
    ToolInvocation::new("seqtk")
        .arg("sample")
        .arg("-s")
        .arg(seed.to_string())
        .arg(input)
        .arg(n.to_string())
        .stdout_to(output)
}

/// `seqtk seq -A IN > OUT`: FASTQ to FASTA
pub fn seqtk_to_fasta(input: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new("seqtk")
        .args(["seq", "-A"])
        .arg(input)
        .stdout_to(output)
}

/// Megablast of sampled reads against the subtype panel database, tabular output
pub fn blastn_panel(query: &Path, db: &Path, threads: usize, output: &Path) -> ToolInvocation {
    ToolInvocation::new("blastn")
        .args(["-task", "megablast", "-query"])
        .arg(query)
        .args(["-outfmt", "6", "-num_threads"])
        .arg(threads.to_string())
        .arg("-db")
        .arg(db)
        .arg("-out")
        .arg(output)
}

/// Sensitive blastn of reads against a single reference FASTA, XML output
pub fn blastn_subject(query: &Path, subject: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new("blastn")
        .args(["-task", "blastn", "-subject"])
        .arg(subject)
        .arg("-query")
        .arg(query)
        .args(["-outfmt", "5", "-out"])
        .arg(output)
        .args(["-word_size", "7", "-qcov_hsp_perc", "80"])
}

/// `blast2sam.py XML > SAM`
pub fn blast2sam(xml: &Path, sam: &Path) -> ToolInvocation {
    ToolInvocation::new("blast2sam.py").arg(xml).stdout_to(sam)
}

pub fn bwa_index(prefix: &Path, reference: &Path) -> ToolInvocation {
    ToolInvocation::new("bwa")
        .args(["index", "-p"])
        .arg(prefix)
        .arg(reference)
}

/// `bwa mem` with a raised gap-open penalty
pub fn bwa_mem(threads: usize, prefix: &Path, reads: &Path, sam: &Path) -> ToolInvocation {
    ToolInvocation::new("bwa")
        .args(["mem", "-t"])
        .arg(threads.to_string())
        .args(["-O", "12"])
        .arg(prefix)
        .arg(reads)
        .stdout_to(sam)
}

pub fn novoindex(index: &Path, reference: &Path) -> ToolInvocation {
    ToolInvocation::new("novoindex").arg(index).arg(reference)
}

pub fn novoalign(threads: usize, index: &Path, reads: &Path, sam: &Path) -> ToolInvocation {
    ToolInvocation::new("novoalign")
        .arg("-c")
        .arg(threads.to_string())
        .arg("-d")
        .arg(index)
        .arg("-f")
        .arg(reads)
        .args(["-F", "STDFQ", "-o", "SAM"])
        .stdout_to(sam)
}

pub fn smalt_index(prefix: &Path, reference: &Path) -> ToolInvocation {
    ToolInvocation::new("smalt")
        .args(["index", "-k", "7", "-s", "2"])
        .arg(prefix)
        .arg(reference)
}

pub fn smalt_map(threads: usize, prefix: &Path, reads: &Path, sam: &Path) -> ToolInvocation {
    ToolInvocation::new("smalt")
        .args(["map", "-n"])
        .arg(threads.to_string())
        .arg("-o")
        .arg(sam)
        .args(["-x", "-c", "0.8", "-y", "0.8"])
        .arg(prefix)
        .arg(reads)
}

/// `samtools view -u [-F FLAGS] -o OUT IN`: SAM to uncompressed BAM
pub fn samtools_view(input: &Path, exclude_flags: Option<u16>, output: &Path) -> ToolInvocation {
    let mut invocation = ToolInvocation::new("samtools").args(["view", "-u"]);
    if let Some(flags) = exclude_flags {
        invocation = invocation.arg("-F").arg(flags.to_string());
    }
    invocation.arg("-o").arg(output).arg(input)
}

pub fn samtools_sort(
    threads: usize,
    temp_prefix: &Path,
    input: &Path,
    output: &Path,
) -> ToolInvocation {
    ToolInvocation::new("samtools")
        .args(["sort", "-T"])
        .arg(temp_prefix)
        .arg("-@")
        .arg(threads.to_string())
        .arg("-o")
        .arg(output)
        .arg(input)
}

pub fn samtools_index(bam: &Path) -> ToolInvocation {
    ToolInvocation::new("samtools").arg("index").arg(bam)
}

pub fn samtools_faidx(reference: &Path) -> ToolInvocation {
    ToolInvocation::new("samtools").arg("faidx").arg(reference)
}

/// `lofreq call-parallel`: low-frequency variant calls with an `AF` INFO key
pub fn lofreq_call(threads: usize, reference: &Path, bam: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new("lofreq")
        .args(["call-parallel", "--pp-threads"])
        .arg(threads.to_string())
        .arg("-f")
        .arg(reference)
        .arg(bam)
        .arg("-o")
        .arg(output)
}

/// `bgzip -f FILE`: compress in place to `FILE.gz`
pub fn bgzip(path: &Path) -> ToolInvocation {
    ToolInvocation::new("bgzip").arg("-f").arg(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seqtk_sample() {
        let invocation = seqtk_sample(11, Path::new("hq.fastq"), 1000, Path::new("smp.fastq"));
        assert_eq!(
            invocation.command_line(),
            "seqtk sample -s 11 hq.fastq 1000 > smp.fastq"
        );
    }

    #[test]
    fn test_blastn_panel() {
        let invocation = blastn_panel(
            Path::new("sample_hq.fasta"),
            Path::new("db/HIV_cons_db"),
            6,
            Path::new("loc_res.tsv"),
        );
        assert_eq!(
            invocation.command_line(),
            "blastn -task megablast -query sample_hq.fasta -outfmt 6 -num_threads 6 -db db/HIV_cons_db -out loc_res.tsv"
        );
    }

    #[test]
    fn test_samtools_view_excludes_reverse() {
        let invocation = samtools_view(Path::new("in.sam"), Some(16), Path::new("out.bam"));
        assert_eq!(
            invocation.command_line(),
            "samtools view -u -F 16 -o out.bam in.sam"
        );
        let invocation = samtools_view(Path::new("in.sam"), None, Path::new("out.bam"));
        assert_eq!(invocation.command_line(), "samtools view -u -o out.bam in.sam");
    }

    #[test]
    fn test_lofreq_output_flag() {
        let invocation = lofreq_call(4, Path::new("ref.fa"), Path::new("x.bam"), Path::new("calls.vcf"));
        assert_eq!(invocation.value_of("-o"), Some(Path::new("calls.vcf")));
        assert_eq!(invocation.value_of("--pp-threads"), Some(Path::new("4")));
    }

    #[test]
    fn test_bwa_mem_gap_open() {
        let invocation = bwa_mem(12, Path::new("tmpref"), Path::new("r.fastq"), Path::new("o.sam"));
        assert_eq!(
            invocation.command_line(),
            "bwa mem -t 12 -O 12 tmpref r.fastq > o.sam"
        );
    }
}
