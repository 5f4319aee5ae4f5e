/*!

This is the long-form manual for `poll_consolidation` and `pollmerge`.

## Input files

All the files are CSV, encoded in UTF-8, with a header row. The columns can
come in any order; extra columns are ignored.

### `candidats.csv`

The candidate table: `candidate_id, complete_name, name, surname, parti`.
`candidate_id` is a short unique code (`MLP`, `JLM`, ...). `parti` may be
blank.

### `hypotheses.csv`

The scenarios: `id_hypothese, hypothese_complete`. The second column lists the
candidates tested together, separated by commas, in the order of the
published poll:

```text
id_hypothese,hypothese_complete
H1,"Marine Le Pen, Jean-Luc Mélenchon, Edouard Philippe"
```

A name of a hypothesis that does not match a complete name of the candidate
table may match a surname, as long as that surname is unique in the table.

### `polls.csv`

The poll registry, one row per published poll. Mandatory columns:
`poll_id, hypothese, nom_institut, commanditaire, debut_enquete, fin_enquete,
echantillon, population, tour, filename`. Of those, `poll_id, hypothese,
debut_enquete, fin_enquete, echantillon, filename` may never be blank.

Optional columns: `rolling`, `media`, and the sub-samples `sous_echantillon1`,
`sous_population1`, `sous_echantillon2`, ...

The identifier encodes the start date, the end date, the initials of the
institute and the letter of the hypothesis: `20250326_0327_if_A`.

### `polls/<poll_id>.csv`

The results of one poll: `candidat, intentions, erreur_sup, erreur_inf`.
The names are matched against the candidate table regardless of accents,
case and spacing, so `Edouard Philippe` and `Édouard  Philippe` are the same
candidate. The name written in the file is kept as is in the output.

Blank numbers mean "not available". A candidate of the hypothesis that does
not appear in the file was not polled and gets no row in the output.

## Output

`presidentielle2027.csv` has one row per (poll, candidate) with the columns:
`poll_id, hypothese, nom_institut, commanditaire, debut_enquete, fin_enquete,
echantillon, population, rolling, media, tour, filename, candidate_id,
candidat, complete_name, name, surname, parti, intentions, erreur_sup,
erreur_inf`.

The output is rebuilt from scratch at each run and replaced in one step. If
any check fails, the previous file is left untouched.

With `--json`, the same content is also written grouped by poll, in the
format used for the 2022 election.

## Checks

* every poll of the registry has a result file, and every result file is in
  the registry
* every hypothesis exists
* every name of a result file matches a candidate
* identifiers are unique: polls, candidates, hypotheses, and a candidate
  appears once per poll
* numbers are non-negative
* mandatory fields are filled

All the problems are reported at once.

## Margins of error

`pollmerge --fill-margins` computes the margins of the result rows that have
none, at the 95% confidence level, from the size of the most specific
sub-sample (or the full sample). Margins already copied from a published
notice are never overwritten.

*/
