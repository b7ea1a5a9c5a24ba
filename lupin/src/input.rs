use crate::common::*;

use lupin_net::common_io::{read_lines, split_tsv};
use lupin_net::ExpressionMatrix;

/// Read a clean expression table from the upstream pipeline.
///
/// Format: TSV (optionally gzipped), one header line naming the samples,
/// then one row per gene with the gene identifier in the first column and
/// one numeric value per sample. Lines starting with `#` are comments.
/// Semantic validation (unique identifiers, finite values, variance,
/// sample count) happens in [`ExpressionMatrix::new`].
pub fn read_expression_tsv(data_file: &str) -> anyhow::Result<ExpressionMatrix> {
    let lines = read_lines(data_file)?;
    let mut rows = lines
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| !l.is_empty() && !l.starts_with('#'));

    let header = rows
        .next()
        .ok_or_else(|| anyhow::anyhow!("{}: empty expression file", data_file))?;
    let num_samples = split_tsv(header).len() - 1;
    if num_samples == 0 {
        return Err(anyhow::anyhow!(
            "{}: header names no sample columns",
            data_file
        ));
    }

    let mut gene_names: Vec<Box<str>> = vec![];
    let mut values: Vec<f32> = vec![];

    for line in rows {
        let fields = split_tsv(line);
        let gene = fields[0];
        if fields.len() != num_samples + 1 {
            return Err(anyhow::anyhow!(
                "{}: gene {} has {} values, header names {} samples",
                data_file,
                gene,
                fields.len() - 1,
                num_samples
            ));
        }
        for field in &fields[1..] {
            let x: f32 = field.parse().map_err(|_| {
                anyhow::anyhow!("{}: gene {}: cannot parse '{}'", data_file, gene, field)
            })?;
            values.push(x);
        }
        gene_names.push(gene.into());
    }

    let num_genes = gene_names.len();
    info!(
        "read {} genes x {} samples from {}",
        num_genes, num_samples, data_file
    );

    let data = Mat::from_row_slice(num_genes, num_samples, &values);
    Ok(ExpressionMatrix::new(data, gene_names)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lupin_net::common_io::write_lines;

    fn write_tmp(lines: &[&str]) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expr.tsv").to_str().unwrap().to_string();
        let owned: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        write_lines(&owned, &path).unwrap();
        (dir, path)
    }

    #[test]
    fn test_read_round_trip() {
        let (_dir, path) = write_tmp(&[
            "gene\ts1\ts2\ts3\ts4",
            "# a comment row",
            "g1\t1.0\t2.0\t3.0\t4.0",
            "g2\t4.0\t3.0\t2.0\t1.0",
        ]);
        let expr = read_expression_tsv(&path).unwrap();
        assert_eq!(expr.num_genes(), 2);
        assert_eq!(expr.num_samples(), 4);
        assert_eq!(expr.gene_names()[1].as_ref(), "g2");
        assert_eq!(expr.data()[(0, 3)], 4.0);
    }

    #[test]
    fn test_ragged_row_names_gene() {
        let (_dir, path) = write_tmp(&[
            "gene\ts1\ts2\ts3\ts4",
            "g1\t1.0\t2.0\t3.0\t4.0",
            "g2\t4.0\t3.0",
        ]);
        let err = read_expression_tsv(&path).unwrap_err();
        assert!(err.to_string().contains("g2"), "{}", err);
    }

    #[test]
    fn test_bad_number_names_gene() {
        let (_dir, path) = write_tmp(&[
            "gene\ts1\ts2\ts3\ts4",
            "g1\t1.0\tnot-a-number\t3.0\t4.0",
        ]);
        let err = read_expression_tsv(&path).unwrap_err();
        assert!(err.to_string().contains("g1"), "{}", err);
    }

    #[test]
    fn test_validation_flows_through() {
        // duplicate identifiers are a data-quality failure
        let (_dir, path) = write_tmp(&[
            "gene\ts1\ts2\ts3\ts4",
            "g1\t1.0\t2.0\t3.0\t4.0",
            "g1\t4.0\t3.0\t2.0\t1.0",
        ]);
        let err = read_expression_tsv(&path).unwrap_err();
        assert!(err.to_string().contains("duplicated"), "{}", err);
    }
}
