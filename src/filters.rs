//! Filter values offered over the catalog: release years grouped by decade,
//! genres and production countries.

use serde::Serialize;
use starfin_db::Film;

/// The years of one decade present in the catalog range, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decade {
    /// First year of the decade, e.g. `1990`.
    pub decade: i32,
    pub years: Vec<i32>,
}

/// Everything a catalog can be filtered on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogFilters {
    min_year: i32,
    max_year: i32,
    decades: Vec<Decade>,
    genres: Vec<String>,
    countries: Vec<String>,
}

impl CatalogFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters covering every film.
    pub fn from_films<'a>(films: impl IntoIterator<Item = &'a Film>) -> Self {
        let mut filters = Self::new();
        for film in films {
            filters.add_year(film.release_year);
            filters.add_genres(&film.genres);
            filters.add_countries(&film.countries);
        }
        filters.finish();
        filters
    }

    /// Widen the filters to cover `film`.
    pub fn add_film(&mut self, film: &Film) {
        self.add_year(film.release_year);
        self.add_genres(&film.genres);
        self.add_countries(&film.countries);
        self.finish();
    }

    /// Year range `(min, max)`, `None` while no film has a known year.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        (self.min_year > 0).then_some((self.min_year, self.max_year))
    }

    pub fn decades(&self) -> &[Decade] {
        &self.decades
    }

    /// Sorted genre names.
    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    /// Sorted ISO 3166-1 country codes.
    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    fn add_year(&mut self, year: i32) {
        if year <= 0 {
            return;
        }
        if self.min_year == 0 || year < self.min_year {
            self.min_year = year;
        }
        if self.max_year == 0 || year > self.max_year {
            self.max_year = year;
        }
    }

    fn add_genres(&mut self, genres: &[String]) {
        for genre in genres {
            if !self.genres.contains(genre) {
                self.genres.push(genre.clone());
            }
        }
    }

    fn add_countries(&mut self, countries: &[String]) {
        for country in countries {
            if !self.countries.contains(country) {
                self.countries.push(country.clone());
            }
        }
    }

    fn finish(&mut self) {
        self.genres.sort();
        self.countries.sort();
        self.decades = self.compute_decades();
    }

    fn compute_decades(&self) -> Vec<Decade> {
        let Some((min, max)) = self.year_range() else {
            return Vec::new();
        };

        let mut decades: Vec<Decade> = Vec::new();
        for year in (min..=max).rev() {
            let decade = year - year.rem_euclid(10);
            match decades.last_mut() {
                Some(last) if last.decade == decade => last.years.push(year),
                _ => decades.push(Decade {
                    decade,
                    years: vec![year],
                }),
            }
        }
        decades
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn film(year: i32, genres: &[&str], countries: &[&str]) -> Film {
        Film {
            release_year: year,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            countries: countries.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty() {
        let filters = CatalogFilters::new();
        assert_eq!(filters.year_range(), None);
        assert!(filters.decades().is_empty());
    }

    #[test]
    fn test_decades_span_range() {
        let films = [
            film(1998, &["Drama"], &["US"]),
            film(2001, &["Crime", "Drama"], &["FR", "US"]),
        ];
        let filters = CatalogFilters::from_films(&films);

        assert_eq!(filters.year_range(), Some((1998, 2001)));
        assert_eq!(
            filters.decades(),
            &[
                Decade {
                    decade: 2000,
                    years: vec![2001, 2000]
                },
                Decade {
                    decade: 1990,
                    years: vec![1999, 1998]
                },
            ]
        );
        assert_eq!(filters.genres(), &["Crime", "Drama"]);
        assert_eq!(filters.countries(), &["FR", "US"]);
    }

    #[test]
    fn test_add_film_widens() {
        let mut filters = CatalogFilters::from_films(&[film(2010, &["Drama"], &[])]);
        filters.add_film(&film(2008, &["Animation"], &["JP"]));

        assert_eq!(filters.year_range(), Some((2008, 2010)));
        assert_eq!(filters.decades().len(), 2);
        assert_eq!(filters.genres(), &["Animation", "Drama"]);
        assert_eq!(filters.countries(), &["JP"]);
    }

    #[test]
    fn test_unknown_year_ignored() {
        let filters = CatalogFilters::from_films(&[film(0, &[], &[]), film(1984, &[], &[])]);
        assert_eq!(filters.year_range(), Some((1984, 1984)));
    }
}
