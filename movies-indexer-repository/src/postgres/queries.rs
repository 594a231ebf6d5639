//! SQL statements for the movie source.
//!
//! Table names are qualified with a validated schema name at construction
//! time; every value is passed as a bind parameter.

use movies_indexer_shared::EntityKind;

/// Fully qualified table names for one schema.
#[derive(Debug, Clone)]
pub(crate) struct Queries {
    scan_person: String,
    scan_genre: String,
    scan_movie: String,
    pub movies_by_persons: String,
    pub movies_by_genres: String,
    pub full_movie_rows: String,
}

impl Queries {
    pub fn new(schema: &str) -> Self {
        let scan = |table: &str| {
            format!(
                "SELECT id, modified_at FROM {schema}.{table} \
                 WHERE (modified_at, id) > ($1, $2) \
                 ORDER BY modified_at, id \
                 LIMIT $3"
            )
        };

        Self {
            scan_person: scan("person"),
            scan_genre: scan("genre"),
            scan_movie: scan("film_work"),
            movies_by_persons: format!(
                "SELECT DISTINCT fw.id, fw.modified_at \
                 FROM {schema}.film_work fw \
                 JOIN {schema}.person_film_work pfw ON pfw.film_work_id = fw.id \
                 WHERE pfw.person_id = ANY($1) \
                 ORDER BY fw.modified_at, fw.id"
            ),
            movies_by_genres: format!(
                "SELECT DISTINCT fw.id, fw.modified_at \
                 FROM {schema}.film_work fw \
                 JOIN {schema}.genre_film_work gfw ON gfw.film_work_id = fw.id \
                 WHERE gfw.genre_id = ANY($1) \
                 ORDER BY fw.modified_at, fw.id"
            ),
            full_movie_rows: format!(
                "SELECT \
                    fw.id, \
                    fw.title, \
                    fw.description, \
                    fw.rating::float8 AS rating, \
                    fw.type, \
                    fw.created_at, \
                    fw.modified_at, \
                    COALESCE(( \
                        SELECT json_agg(json_build_object( \
                            'id', p.id, \
                            'full_name', p.full_name, \
                            'role', pfw.role \
                        ) ORDER BY pfw.created_at, p.id) \
                        FROM {schema}.person_film_work pfw \
                        JOIN {schema}.person p ON p.id = pfw.person_id \
                        WHERE pfw.film_work_id = fw.id \
                    ), '[]'::json) AS persons, \
                    COALESCE(( \
                        SELECT array_agg(g.name) \
                        FROM {schema}.genre_film_work gfw \
                        JOIN {schema}.genre g ON g.id = gfw.genre_id \
                        WHERE gfw.film_work_id = fw.id \
                    ), ARRAY[]::text[]) AS genres \
                 FROM {schema}.film_work fw \
                 WHERE fw.id = ANY($1)"
            ),
        }
    }

    /// The change scan statement for `kind`.
    pub fn scan(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Person => &self.scan_person,
            EntityKind::Genre => &self.scan_genre,
            EntityKind::Movie => &self.scan_movie,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_uses_composite_predicate_and_order() {
        let queries = Queries::new("content");
        let scan = queries.scan(EntityKind::Person);

        assert!(scan.contains("FROM content.person "));
        assert!(scan.contains("(modified_at, id) > ($1, $2)"));
        assert!(scan.contains("ORDER BY modified_at, id"));
        assert!(scan.contains("LIMIT $3"));
    }

    #[test]
    fn test_movie_scan_targets_film_work() {
        let queries = Queries::new("content");
        assert!(queries.scan(EntityKind::Movie).contains("content.film_work"));
        assert!(queries.scan(EntityKind::Genre).contains("content.genre "));
    }

    #[test]
    fn test_fanout_queries_join_associations() {
        let queries = Queries::new("content");
        assert!(queries.movies_by_persons.contains("content.person_film_work"));
        assert!(queries.movies_by_genres.contains("content.genre_film_work"));
        assert!(queries.full_movie_rows.contains("WHERE fw.id = ANY($1)"));
    }
}
